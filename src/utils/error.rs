use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaqtiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Authentication rejected: {message}")]
    AuthRejected { message: String },

    #[error("Profile write failed for user {user_id}: {message}")]
    ProfileWriteFailed { user_id: String, message: String },

    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    #[error("Backend responded with status {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("Invalid profile {user_id}: {reason}")]
    InvalidProfile { user_id: String, reason: String },

    #[error("Catalog error: {message}")]
    CatalogError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Profile,
    Network,
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

impl WaqtiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn auth_rejected(message: impl Into<String>) -> Self {
        Self::AuthRejected {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::AuthRejected { .. } => ErrorCategory::Authentication,
            Self::ProfileWriteFailed { .. } => ErrorCategory::Profile,
            Self::HttpError(_) | Self::NetworkUnavailable { .. } | Self::BackendError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_)
            | Self::CatalogError { .. }
            | Self::InvalidProfile { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Authentication => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Profile | ErrorCategory::Configuration | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給畫面顯示的單行訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::AuthRejected { message } => format!("Sign-in failed: {}", message),
            Self::ProfileWriteFailed { .. } => {
                "Your account was created but the profile could not be saved. Please contact support."
                    .to_string()
            }
            Self::HttpError(_) | Self::NetworkUnavailable { .. } => {
                "The service is unreachable right now. Please try again.".to_string()
            }
            Self::BackendError { message, .. } => format!("The server rejected the request: {}", message),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            Self::CatalogError { message } => format!("Service catalog problem: {}", message),
            Self::SerializationError(_) | Self::InvalidProfile { .. } => {
                "Received data in an unexpected format.".to_string()
            }
            Self::IoError(e) => format!("File system error: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the highlighted fields and submit again",
            ErrorCategory::Authentication => "Verify your email and password, or register a new account",
            ErrorCategory::Profile => "Retry registration later; the orphaned account id has been logged",
            ErrorCategory::Network => "Check your connection and the backend URL in the configuration",
            ErrorCategory::Configuration => "Fix the configuration file or environment variables",
            ErrorCategory::Data => "Verify the catalog file and backend schema",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    /// 轉換成 Session 邊界允許的錯誤種類
    ///
    /// Only `ValidationError`, `AuthRejected`, `ProfileWriteFailed` and
    /// `NetworkUnavailable` leave the session manager.
    pub fn into_auth_failure(self) -> Self {
        match self {
            Self::ValidationError { .. }
            | Self::AuthRejected { .. }
            | Self::ProfileWriteFailed { .. }
            | Self::NetworkUnavailable { .. } => self,
            Self::HttpError(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                Self::NetworkUnavailable {
                    message: e.to_string(),
                }
            }
            Self::IoError(e) => Self::NetworkUnavailable {
                message: e.to_string(),
            },
            Self::BackendError { message, .. } => Self::AuthRejected { message },
            other => Self::AuthRejected {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, WaqtiError>;
