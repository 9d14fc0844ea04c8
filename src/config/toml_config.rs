use crate::config::params::CustomParams;
use crate::config::{validate_common, OutputFormat, DEFAULT_OUTPUT_FORMATS};
use crate::core::fetcher::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT_SECS};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub params: CustomParams,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub access_token: String,
    pub timeout_seconds: Option<u64>,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<OutputFormat>,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_formats() -> Vec<OutputFormat> {
    DEFAULT_OUTPUT_FORMATS.to_vec()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換 `${VAR_NAME}`；找不到的變數保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    tracing::warn!("⚠️ Environment variable {} is not set", var_name);
                    format!("${{{}}}", var_name)
                })
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        if ENV_VAR_PATTERN.is_match(&self.source.access_token) {
            return Err(EtlError::MissingConfigError {
                field: "source.access_token".to_string(),
            });
        }
        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "monitoring.log_level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", LOG_LEVELS.join(", ")),
                });
            }
        }
        validate_common(self)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.source.base_url
    }

    fn access_token(&self) -> &str {
        &self.source.access_token
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn custom_params(&self) -> &CustomParams {
        &self.params
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn max_pages(&self) -> usize {
        self.source.max_pages.unwrap_or(DEFAULT_MAX_PAGES)
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.load.output_formats
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::{ParamList, RunConfig};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DEALS_TOML: &str = r#"
[pipeline]
name = "hubspot-deals"
description = "Deals with stage history"

[source]
access_token = "pat-na1-test"
timeout_seconds = 10

[params]
hubspot_object = "deals"
limit = 100
properties = ["dealname", "amount"]
flatten_properties_stage_fields = true
unknown_option = "kept"

[load]
output_path = "./test-output"
output_formats = ["json"]
"#;

    #[test]
    fn test_parse_hubspot_toml_config() {
        let config = TomlConfig::from_toml_str(DEALS_TOML).unwrap();

        assert_eq!(config.pipeline.name, "hubspot-deals");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_pages(), DEFAULT_MAX_PAGES);
        assert_eq!(config.output_formats(), &[OutputFormat::Json]);
        assert_eq!(
            config.params.properties,
            Some(ParamList::Many(vec!["dealname".to_string(), "amount".to_string()]))
        );
        assert!(config.params.extra.contains_key("unknown_option"));

        let run = RunConfig::try_from(config.custom_params()).unwrap();
        assert_eq!(run.object_kind, "deals");
        assert_eq!(run.limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HUBSPOT_ETL_TEST_TOKEN", "pat-from-env");

        let toml_content = r#"
[pipeline]
name = "test"

[source]
access_token = "${HUBSPOT_ETL_TEST_TOKEN}"

[params]
hubspot_object = "contacts"

[load]
output_path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.access_token(), "pat-from-env");
        assert_eq!(config.output_formats(), &DEFAULT_OUTPUT_FORMATS);

        std::env::remove_var("HUBSPOT_ETL_TEST_TOKEN");
    }

    #[test]
    fn test_unresolved_token_fails_validation() {
        let toml_content = r#"
[pipeline]
name = "test"

[source]
access_token = "${HUBSPOT_ETL_TOKEN_THAT_IS_NOT_SET}"

[params]
hubspot_object = "contacts"

[load]
output_path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let bad_url = DEALS_TOML.replace(
            "access_token = \"pat-na1-test\"",
            "access_token = \"pat-na1-test\"\nbase_url = \"invalid-url\"",
        );
        assert!(TomlConfig::from_toml_str(&bad_url).unwrap().validate().is_err());

        let large_limit = DEALS_TOML.replace("limit = 100", "limit = 500");
        assert!(TomlConfig::from_toml_str(&large_limit).unwrap().validate().is_ok());

        let bad_level = format!("{}\n[monitoring]\nenabled = false\nlog_level = \"loud\"\n", DEALS_TOML);
        assert!(matches!(
            TomlConfig::from_toml_str(&bad_level).unwrap().validate(),
            Err(EtlError::InvalidConfigValueError { ref field, .. }) if field == "monitoring.log_level"
        ));

        let bad_format = DEALS_TOML.replace("[\"json\"]", "[\"parquet\"]");
        assert!(TomlConfig::from_toml_str(&bad_format).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(DEALS_TOML.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "hubspot-deals");
        assert!(!config.monitoring_enabled());
        assert_eq!(config.log_level(), None);
    }

    #[test]
    fn test_monitoring_section() {
        let content = format!(
            "{}\n[monitoring]\nenabled = true\nlog_level = \"DEBUG\"\n",
            DEALS_TOML
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert!(config.monitoring_enabled());
        assert_eq!(config.log_level(), Some("DEBUG"));
        assert!(config.validate().is_ok());
    }
}
