pub mod cast;
pub mod catalog;
pub mod dispatcher;
pub mod etl;
pub mod fetcher;
pub mod flatten;
pub mod schema;
pub mod stage_fields;

pub use crate::domain::model::{Extraction, Record};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::domain::table::FinalTable;
pub use crate::utils::error::Result;
