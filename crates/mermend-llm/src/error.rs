use std::time::Duration;

use thiserror::Error;

/// Where to get a fresh key when the configured one is out of quota.
pub const API_KEY_URL: &str = "https://aistudio.google.com/";

/// A failed call to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("LLM request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn is_quota(&self) -> bool {
        matches!(self, ApiError::QuotaExceeded(_))
    }

    /// Message to show the user. Quota errors get an actionable text of
    /// their own; everything else is shown as-is.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::QuotaExceeded(_) => format!(
                "API quota limit exceeded. The configured API key has reached its usage limit. \
                 Please use your own API key. New keys are available at {API_KEY_URL}"
            ),
            ApiError::Timeout(_) => format!("{self}. Try again or raise the request timeout."),
            ApiError::Other(_) => format!("Error: {self}"),
        }
    }
}

/// Map a non-success HTTP response to an [`ApiError`].
pub(crate) fn classify_failure(status: u16, body: &str) -> ApiError {
    let lower = body.to_ascii_lowercase();
    if status == 429 || lower.contains("quota") || lower.contains("resource_exhausted") {
        return ApiError::QuotaExceeded(format!("status {status}"));
    }
    ApiError::Other(format!("LLM request failed ({status}): {body}"))
}

/// Failure of a whole diagram generation. Only the first model call can
/// produce one; everything after it degrades instead of failing.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("diagram generation failed: {0}")]
    Api(#[from] ApiError),
}

impl GenerationError {
    pub fn api(&self) -> &ApiError {
        match self {
            GenerationError::Api(e) => e,
        }
    }

    pub fn user_message(&self) -> String {
        self.api().user_message()
    }
}
