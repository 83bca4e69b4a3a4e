use thiserror::Error;

/// Main error type for the planning pipeline
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("AI quota exhausted after {attempts} attempts")]
    QuotaExceeded { attempts: usize },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("No geocoding results found for `{0}`")]
    NoResultsFound(String),

    #[error("Routing failed: {0}")]
    RoutingFailed(String),

    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Shared plan payload too large ({size} bytes, limit {limit})")]
    EncodingTooLarge { size: usize, limit: usize },

    #[error("Corrupt share link: {0}")]
    CorruptShareLink(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Another request for this stage is already in flight")]
    Busy,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Check if this error is worth retrying from the user's point of view
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::QuotaExceeded { .. }
                | PlannerError::GenerationFailed(_)
                | PlannerError::RoutingFailed(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            PlannerError::GenerationFailed(_) => "GENERATION_FAILED",
            PlannerError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            PlannerError::NoResultsFound(_) => "NO_RESULTS_FOUND",
            PlannerError::RoutingFailed(_) => "ROUTING_FAILED",
            PlannerError::Validation { .. } => "VALIDATION_ERROR",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::Storage(_) => "STORAGE_ERROR",
            PlannerError::EncodingTooLarge { .. } => "ENCODING_TOO_LARGE",
            PlannerError::CorruptShareLink(_) => "CORRUPT_SHARE_LINK",
            PlannerError::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            PlannerError::Busy => "BUSY",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}

/// Field-scoped validation failure raised by the wizard's detail form.
///
/// These never reach the network layer; they block a stage transition and
/// carry a message tied to a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

impl From<FieldError> for PlannerError {
    fn from(err: FieldError) -> Self {
        PlannerError::Validation {
            field: err.field.to_string(),
            message: err.message,
        }
    }
}
