pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod params;
pub mod toml_config;

use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "cli")]
use crate::core::fetcher::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT_SECS};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use params::{CustomParams, RunConfig};
#[cfg(feature = "cli")]
use std::time::Duration;

/// 交付檔案中要包含的表格格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub const DEFAULT_OUTPUT_FORMATS: [OutputFormat; 2] = [OutputFormat::Json, OutputFormat::Csv];

/// 檢查連線與輸出設定，並確認自訂參數可以轉成 RunConfig
pub fn validate_common<C: crate::core::ConfigProvider>(config: &C) -> crate::utils::error::Result<()> {
    use crate::utils::validation::*;

    validate_url("base_url", config.base_url())?;
    validate_secret("access_token", config.access_token())?;
    validate_path("output_path", config.output_path())?;
    validate_positive_number("max_pages", config.max_pages(), 1)?;
    validate_positive_number(
        "timeout_seconds",
        config.request_timeout().as_secs() as usize,
        1,
    )?;
    if config.output_formats().is_empty() {
        return Err(crate::utils::error::EtlError::InvalidConfigValueError {
            field: "output_formats".to_string(),
            value: String::new(),
            reason: "At least one output format is required".to_string(),
        });
    }
    params::RunConfig::try_from(config.custom_params())?;
    Ok(())
}

#[cfg(feature = "cli")]
fn parse_custom_params(value: &str) -> std::result::Result<CustomParams, String> {
    CustomParams::from_json_str(value).map_err(|e| e.to_string())
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "hubspot-etl")]
#[command(about = "Extract HubSpot CRM objects into a typed table")]
pub struct CliConfig {
    /// Custom parameters as a JSON object, e.g. '{"hubspot_object":"contacts","flatten_properties":true}'
    #[arg(long, default_value = "{}", value_parser = parse_custom_params)]
    pub params: CustomParams,

    #[arg(long, env = "HUBSPOT_ACCESS_TOKEN", hide_env_values = true, default_value = "")]
    pub access_token: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_enum, value_delimiter = ',', default_values_t = DEFAULT_OUTPUT_FORMATS)]
    pub output_formats: Vec<OutputFormat>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Upper bound on pages fetched per resource
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn run_config(&self) -> Result<RunConfig> {
        RunConfig::try_from(&self.params)
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn custom_params(&self) -> &CustomParams {
        &self.params
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.output_formats
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }
}
