use thiserror::Error;

/// Why an instance could not be authenticated. Scoped to one instance; the
/// run skips it and moves on.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session cookie `{0}` not found after login")]
    MissingCookie(&'static str),

    #[error("access token could not be decoded")]
    TokenDecode,

    #[error("access token has no `{0}` claim")]
    MissingClaim(&'static str),

    #[error("timed out after {secs}s while {step}")]
    Timeout { step: &'static str, secs: u64 },

    #[error("browser error: {0}")]
    Browser(String),
}

/// Why a page request ended a pagination run early.
#[derive(Debug, Error)]
pub enum PageFetchError {
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    MissingCredential(&'static str),

    #[error("instance {0} is outside 1..=24")]
    InvalidInstance(u8),

    #[error("every instance is excluded")]
    NoInstances,
}
