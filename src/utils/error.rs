use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("NextDNS API returned {status} for {operation}: {body}")]
    ApiStatusError {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("All {count} blocklist sources failed to download")]
    AllSourcesFailed { count: usize },

    #[error("Sync finished with {failed} failed domain operations")]
    PartialSyncError { failed: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::HttpError(_) | SyncError::AllSourcesFailed { .. } => ErrorCategory::Network,
            SyncError::ApiStatusError { .. } | SyncError::PartialSyncError { .. } => {
                ErrorCategory::Api
            }
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SyncError::SerializationError(_) | SyncError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            SyncError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 可重試：下一次排程執行通常就會恢復
            SyncError::HttpError(_)
            | SyncError::AllSourcesFailed { .. }
            | SyncError::PartialSyncError { .. } => ErrorSeverity::Medium,
            SyncError::ApiStatusError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            SyncError::ApiStatusError { .. }
            | SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::SerializationError(_)
            | SyncError::ProcessingError { .. } => ErrorSeverity::High,
            SyncError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::HttpError(_) => {
                "Check network connectivity and that the API base URL is reachable".to_string()
            }
            SyncError::ApiStatusError { status: 401, .. }
            | SyncError::ApiStatusError { status: 403, .. } => {
                "Verify NEXTDNS_API_KEY is valid and has access to the profile".to_string()
            }
            SyncError::ApiStatusError { status: 404, .. } => {
                "Verify NEXTDNS_PROFILE_ID points at an existing profile".to_string()
            }
            SyncError::ApiStatusError { .. } => {
                "Retry later; the NextDNS API may be rate limiting or unavailable".to_string()
            }
            SyncError::IoError(_) => "Check file paths and permissions".to_string(),
            SyncError::SerializationError(_) => {
                "The API response format may have changed; run with --verbose".to_string()
            }
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => {
                "Review command line flags, environment variables and the config file".to_string()
            }
            SyncError::AllSourcesFailed { .. } => {
                "Check the URLs in the sources file; the profile was left untouched".to_string()
            }
            SyncError::PartialSyncError { .. } => {
                "The next run will retry the failed domains; see the report for details"
                    .to_string()
            }
            SyncError::ProcessingError { .. } => "Run with --verbose for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Api => format!("NextDNS API problem: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度決定的程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable_severity() {
        let err = SyncError::ApiStatusError {
            operation: "get denylist".to_string(),
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_auth_failure_is_high_severity() {
        let err = SyncError::ApiStatusError {
            operation: "get denylist".to_string(),
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Api);
        assert_eq!(err.exit_code(), 1);
        assert!(err.recovery_suggestion().contains("NEXTDNS_API_KEY"));
    }

    #[test]
    fn test_config_errors() {
        let err = SyncError::MissingConfigError {
            field: "profile_id".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}
