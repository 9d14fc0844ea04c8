use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Error {status}: {message}")]
    RemoteError { status: u16, message: String },

    #[error("Pagination stopped after {max_pages} pages without reaching the last page")]
    PaginationLimitExceeded { max_pages: usize },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Schema inference error: {message}")]
    SchemaError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 屬性目錄取得失敗，呼叫端據此降級（無 include_all_properties、一律字串型別）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("property catalog for '{object}' is unavailable: {reason}")]
    Unavailable { object: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Remote,
    Schema,
    Processing,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 命令列的結束碼；Low 視為成功
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::RemoteError { .. } | EtlError::PaginationLimitExceeded { .. } => {
                ErrorCategory::Remote
            }
            EtlError::SchemaError { .. } => ErrorCategory::Schema,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Processing,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::SchemaError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_) => ErrorSeverity::Medium,
            EtlError::RemoteError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            EtlError::RemoteError { .. }
            | EtlError::PaginationLimitExceeded { .. }
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::IoError(_)
            | EtlError::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } if field == "hubspot_object" => {
                "Missing hubspot_object. Please check custom parameters in source ingestion parameters."
                    .to_string()
            }
            EtlError::MissingConfigError { field } => {
                format!("Provide a value for '{}' in the configuration", field)
            }
            EtlError::InvalidConfigValueError { field, .. }
            | EtlError::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}' and run again", field)
            }
            EtlError::ConfigError { .. } => "Review the configuration file".to_string(),
            EtlError::ApiError(_) => {
                "Check network connectivity to the API host and retry".to_string()
            }
            EtlError::RemoteError { status: 401, .. } | EtlError::RemoteError { status: 403, .. } => {
                "Check the access token and its scopes".to_string()
            }
            EtlError::RemoteError { status: 429, .. } => {
                "Rate limit reached, wait before retrying".to_string()
            }
            EtlError::RemoteError { .. } => {
                "Verify the object type exists and the query parameters are valid".to_string()
            }
            EtlError::PaginationLimitExceeded { .. } => {
                "Raise max_pages or narrow the query".to_string()
            }
            EtlError::SchemaError { .. } => {
                "Records are returned with their natural types".to_string()
            }
            EtlError::IoError(_) | EtlError::ZipError(_) => {
                "Check that the output path exists and is writable".to_string()
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => {
                "Run with --verbose to inspect the offending records".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("配置錯誤: {}", self),
            ErrorCategory::Network => format!("網路錯誤: {}", self),
            ErrorCategory::Remote => format!("HubSpot API 錯誤: {}", self),
            ErrorCategory::Schema => format!("結構推斷錯誤: {}", self),
            ErrorCategory::Processing => format!("資料處理錯誤: {}", self),
            ErrorCategory::Storage => format!("儲存錯誤: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_message_carries_status_and_message() {
        let err = EtlError::RemoteError {
            status: 404,
            message: "Object type not found".to_string(),
        };
        assert_eq!(err.to_string(), "Error 404: Object type not found");
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_server_side_errors_are_retryable_severity() {
        let err = EtlError::RemoteError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.severity().exit_code(), 2);
    }

    #[test]
    fn test_missing_object_suggestion() {
        let err = EtlError::MissingConfigError {
            field: "hubspot_object".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("hubspot_object"));
        assert!(err.user_friendly_message().starts_with("配置錯誤"));
    }
}
