use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Remote API error {status}: {detail}")]
    ApiError { status: u16, detail: String },

    #[error("Invalid API key: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            detail: detail.into(),
        }
    }

    /// True when the remote service answered 404 for the addressed resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ApiError { status, .. } if *status == 404 => ErrorSeverity::Low,
            Self::HttpError(_) => ErrorSeverity::Medium,
            Self::ApiError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::ApiError { .. } | Self::SerializationError(_) => ErrorSeverity::High,
            Self::InvalidApiKey { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorSeverity::High,
            Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Could not reach the email marketing service".to_string(),
            Self::ApiError { status, detail } => {
                format!("The email marketing service rejected the request ({status}: {detail})")
            }
            Self::InvalidApiKey { .. } => {
                "The API key is not valid; expected a key ending in -<datacenter>".to_string()
            }
            Self::MissingConfigError { field } => format!("Setting '{field}' is required"),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{field}' is invalid: {reason}")
            }
            Self::ConfigError { message } | Self::ConfigValidationError { message, .. } => {
                message.clone()
            }
            Self::IoError(e) => format!("File access failed: {e}"),
            Self::SerializationError(e) => format!("Could not parse JSON: {e}"),
        }
    }

    /// Process exit code for an error that ends a CLI command. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.severity() {
            ErrorSeverity::Low => "No action needed",
            ErrorSeverity::Medium => "Retry later; the service may be temporarily unavailable",
            ErrorSeverity::High => "Check the settings file and the API key",
            ErrorSeverity::Critical => "Check file paths and permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
