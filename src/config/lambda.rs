use crate::config::params::CustomParams;
use crate::config::{validate_common, OutputFormat, DEFAULT_OUTPUT_FORMATS};
use crate::core::fetcher::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT_SECS};
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client as S3Client;
use std::env;
use std::time::Duration;

/// Lambda 的配置：連線與 S3 設定取自環境變數，自訂參數來自事件
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub base_url: String,
    pub access_token: String,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_region: String,
    pub timeout_seconds: u64,
    pub max_pages: usize,
    pub output_formats: Vec<OutputFormat>,
    pub params: CustomParams,
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl LambdaConfig {
    pub fn from_env(params: CustomParams) -> Result<Self> {
        let output_formats = match env::var("OUTPUT_FORMATS") {
            Ok(value) => value
                .split(',')
                .map(|f| match f.trim() {
                    "json" => Ok(OutputFormat::Json),
                    "csv" => Ok(OutputFormat::Csv),
                    other => Err(EtlError::InvalidConfigValueError {
                        field: "OUTPUT_FORMATS".to_string(),
                        value: other.to_string(),
                        reason: "Valid formats: json, csv".to_string(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => DEFAULT_OUTPUT_FORMATS.to_vec(),
        };

        Ok(Self {
            base_url: env::var("HUBSPOT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            access_token: env::var("HUBSPOT_ACCESS_TOKEN").unwrap_or_default(),
            s3_bucket: env::var("S3_BUCKET").map_err(|_| EtlError::ConfigError {
                message: "S3_BUCKET environment variable is required".to_string(),
            })?,
            s3_prefix: env::var("S3_PREFIX").unwrap_or_else(|_| "hubspot-etl".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "ap-southeast-2".to_string()),
            timeout_seconds: env_number("REQUEST_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECS),
            max_pages: env_number("MAX_PAGES", DEFAULT_MAX_PAGES),
            output_formats,
            params,
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn output_path(&self) -> &str {
        &self.s3_prefix
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

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("s3_bucket", &self.s3_bucket)?;
        validate_non_empty_string("s3_region", &self.s3_region)?;
        validate_common(self)?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let reason = if bucket_name.len() < 3 || bucket_name.len() > 63 {
        Some("S3 bucket name must be between 3 and 63 characters")
    } else if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        Some("S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots")
    } else if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        Some("S3 bucket name cannot start or end with a hyphen")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// 以 S3 bucket 作為交付位置
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self {
            client,
            bucket,
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    fn key(&self, path: &str) -> String {
        object_key(&self.prefix, path)
    }
}

fn object_key(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

impl Storage for S3Storage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = self.key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| EtlError::ProcessingError {
                message: format!(
                    "Failed to write s3://{}/{} ({}): {}",
                    self.bucket,
                    key,
                    e.code().unwrap_or("unknown"),
                    e.message().unwrap_or("no message")
                ),
            })?;

        tracing::info!("☁️ Uploaded {} bytes to s3://{}/{}", data.len(), self.bucket, key);
        Ok(())
    }
}
