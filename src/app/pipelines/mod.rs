pub mod hubspot_pipeline;

pub use hubspot_pipeline::{HubSpotPipeline, HANDOFF_TABLE_NAME};
