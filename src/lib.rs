pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::cli::LocalStorage;

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Storage};

pub use app::pipelines::HubSpotPipeline;
pub use core::etl::{EtlEngine, RunReport};
pub use utils::error::{EtlError, Result};
