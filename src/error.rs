/// Fatal problems with static inputs: the ranked list or the prompt templates.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("ranked emotion list must contain at least one label")]
    EmptyRankedList,
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse ranked emotion list at {path}: {source}")]
    ParseError {
        path: String,
        source: serde_json::Error,
    },
    #[error("prompt template `{name}` is missing")]
    MissingPromptTemplate { name: String },
}

impl PartialEq for ConfigurationError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::EmptyRankedList, Self::EmptyRankedList) => true,
            (Self::ReadError { path: left, .. }, Self::ReadError { path: right, .. }) => {
                left == right
            }
            (Self::ParseError { path: left, .. }, Self::ParseError { path: right, .. }) => {
                left == right
            }
            (
                Self::MissingPromptTemplate { name: left },
                Self::MissingPromptTemplate { name: right },
            ) => left == right,
            _ => false,
        }
    }
}

impl Eq for ConfigurationError {}

/// Failures talking to the text generation service.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExternalServiceError {
    #[error("request could not be sent: {message}")]
    Unreachable { message: String },
    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("service reported an error: {message}")]
    Reported { message: String },
    #[error("service response could not be read: {message}")]
    MalformedResponse { message: String },
    #[error("request was cancelled")]
    Cancelled,
}

/// Generated task data that does not match the expected shape.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task payload is not valid JSON: {message}")]
    Malformed { message: String },
    #[error("task batch contains no tasks")]
    EmptyBatch,
    #[error("task {index} is invalid: {reason}")]
    InvalidTask { index: usize, reason: String },
}

/// Any failure surfaced to the training views.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrainingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TrainingError {
    /// Configuration problems need a redeploy; everything else can be retried from the UI.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// Text for the inline error banner.
    pub fn banner_message(&self) -> String {
        match self {
            Self::Configuration(error) => format!("Training is unavailable: {}", error),
            Self::ExternalService(ExternalServiceError::Cancelled) => {
                "The request was cancelled. Try again.".to_string()
            }
            Self::ExternalService(_) => {
                "We couldn't reach the training assistant. Try again.".to_string()
            }
            Self::Validation(_) => {
                "The generated exercises were unusable. Try again for a fresh set.".to_string()
            }
        }
    }
}
