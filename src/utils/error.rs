use thiserror::Error;

/// 送出失敗時唯一對使用者顯示的訊息
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate treatment plan";

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamStatusError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Model response could not be parsed: {message}")]
    ModelResponseError { message: String },

    #[error("Submission failed with HTTP {status}")]
    SubmissionError { status: u16 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Vector store error: {message}")]
    StorageError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Configuration,
    Data,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PromptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PromptError::ApiError(_) => ErrorCategory::Network,
            PromptError::UpstreamStatusError { .. }
            | PromptError::ModelResponseError { .. }
            | PromptError::SubmissionError { .. } => ErrorCategory::Upstream,
            PromptError::ConfigError { .. }
            | PromptError::MissingConfigError { .. }
            | PromptError::InvalidConfigValueError { .. }
            | PromptError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            PromptError::SerializationError(_)
            | PromptError::XmlError(_)
            | PromptError::ProcessingError { .. } => ErrorCategory::Data,
            PromptError::ValidationError { .. } => ErrorCategory::Input,
            PromptError::IoError(_) | PromptError::StorageError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PromptError::ApiError(_)
            | PromptError::UpstreamStatusError { .. }
            | PromptError::SubmissionError { .. } => ErrorSeverity::Medium,
            PromptError::ModelResponseError { .. }
            | PromptError::SerializationError(_)
            | PromptError::XmlError(_)
            | PromptError::ProcessingError { .. }
            | PromptError::ValidationError { .. }
            | PromptError::ConfigError { .. }
            | PromptError::MissingConfigError { .. }
            | PromptError::InvalidConfigValueError { .. }
            | PromptError::ConfigValidationError { .. } => ErrorSeverity::High,
            PromptError::IoError(_) | PromptError::StorageError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PromptError::ApiError(_) => {
                "Check network connectivity and that the target service is running".to_string()
            }
            PromptError::UpstreamStatusError { service, status, .. } => match status {
                401 | 403 => format!("Check the API key configured for {}", service),
                429 => format!("{} is rate limiting requests; wait and try again", service),
                _ => format!("{} may be temporarily unavailable; try again later", service),
            },
            PromptError::ModelResponseError { .. } => {
                "The model did not return valid JSON; retry the analysis".to_string()
            }
            PromptError::SubmissionError { .. } => {
                "Make sure the analysis server is running and reachable".to_string()
            }
            PromptError::ConfigError { .. }
            | PromptError::ConfigValidationError { .. }
            | PromptError::InvalidConfigValueError { .. } => {
                "Review the configuration file and environment variables".to_string()
            }
            PromptError::MissingConfigError { field } => {
                format!("Set '{}' in the configuration file or environment", field)
            }
            PromptError::SerializationError(_) | PromptError::XmlError(_) => {
                "The upstream payload was malformed; check the service response".to_string()
            }
            PromptError::ProcessingError { .. } => {
                "Inspect the input data and logs for details".to_string()
            }
            PromptError::ValidationError { .. } => "Correct the input and submit again".to_string(),
            PromptError::IoError(_) => "Check file permissions and available disk space".to_string(),
            PromptError::StorageError { .. } => {
                "Check the vector store connection and table definitions".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PromptError::ApiError(_) => "Could not reach a remote service".to_string(),
            PromptError::UpstreamStatusError { service, status, .. } => {
                format!("{} rejected the request (HTTP {})", service, status)
            }
            PromptError::SubmissionError { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            PromptError::ValidationError { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
