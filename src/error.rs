use thiserror::Error;

/// Number of characters of raw model output kept on a parse failure.
pub const SNIPPET_LIMIT: usize = 200;

/// Main error type for the generation gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No API credentials configured")]
    NoCredentialsConfigured,

    #[error("Configuration error: {0}")]
    Config(String),

    /// A single attempt was rejected for quota or rate-limit reasons.
    #[error("Quota exceeded for credential #{credential_index}: {message}")]
    Quota {
        credential_index: usize,
        message: String,
    },

    #[error("Quota exhausted after {attempts} attempt(s): {last_message}")]
    QuotaExhausted {
        attempts: usize,
        last_message: String,
    },

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Failed to extract itinerary from model response: {reason}")]
    Parse { snippet: String, reason: String },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Build a parse error carrying a bounded prefix of the offending text.
    pub fn parse(raw: &str, reason: impl Into<String>) -> Self {
        GatewayError::Parse {
            snippet: snippet_of(raw),
            reason: reason.into(),
        }
    }

    /// Whether this error is the quota/rate-limit signal that justifies rotating credentials.
    pub fn is_quota(&self) -> bool {
        matches!(self, GatewayError::Quota { .. })
    }

    /// Whether the caller sent something unusable, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "VALIDATION_ERROR",
            GatewayError::NoCredentialsConfigured => "NO_CREDENTIALS_CONFIGURED",
            GatewayError::Config(_) => "CONFIG_ERROR",
            GatewayError::Quota { .. } => "QUOTA_ERROR",
            GatewayError::QuotaExhausted { .. } => "QUOTA_EXHAUSTED",
            GatewayError::Upstream(_) => "UPSTREAM_ERROR",
            GatewayError::Parse { .. } => "PARSE_ERROR",
            GatewayError::Timeout(_) => "TIMEOUT_ERROR",
            GatewayError::Cancelled => "CANCELLED",
            GatewayError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Message safe to show to callers. Validation messages describe the caller's own
    /// input; everything else is generic so snippets and credential details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Validation(message) => message.clone(),
            GatewayError::QuotaExhausted { .. } | GatewayError::Quota { .. } => {
                "The itinerary service is busy right now. Please try again shortly.".to_string()
            }
            GatewayError::Parse { .. } => {
                "The generated itinerary could not be read. Please try again.".to_string()
            }
            GatewayError::Timeout(_) => "The itinerary service took too long to respond.".to_string(),
            GatewayError::Cancelled => "The request was cancelled.".to_string(),
            _ => "Failed to generate a response.".to_string(),
        }
    }

    /// Convert to a caller-facing error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        })
    }
}

/// First [`SNIPPET_LIMIT`] characters of `raw`, cut on a char boundary.
pub fn snippet_of(raw: &str) -> String {
    raw.chars().take(SNIPPET_LIMIT).collect()
}
