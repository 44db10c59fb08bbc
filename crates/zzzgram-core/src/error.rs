//! Error types for zzzgram-core.
//!
//! Authentication and acquisition failures are hard: they abort a run and
//! their message ends up in the result envelope. Generation and publish
//! failures are soft: they are absorbed at their component boundary.

use thiserror::Error;

/// Result type alias using zzzgram-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Failures of the two-stage login.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity provider request failed: {0}")]
    IdentityTransport(String),

    #[error("Identity provider rejected credentials ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Vendor authorization request failed: {0}")]
    VendorTransport(String),

    #[error("Vendor authorization failed ({status}): {message}")]
    VendorRejected { status: u16, message: String },

    #[error("Missing '{field}' in {stage} response")]
    MissingField {
        stage: &'static str,
        field: &'static str,
    },

    #[error("Invalid {stage} response: {message}")]
    InvalidResponse {
        stage: &'static str,
        message: String,
    },
}

impl AuthError {
    pub(crate) fn missing(stage: &'static str, field: &'static str) -> Self {
        Self::MissingField { stage, field }
    }
}

/// Failures while retrieving telemetry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Telemetry request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Telemetry request failed: {0}")]
    Transport(String),

    #[error("Telemetry endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed telemetry payload: {0}")]
    Malformed(String),
}

/// Failures of the generative backend. Never escapes `InsightGenerator`.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("{0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("backend response contained no results")]
    EmptyResponse,

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Failures of the notification sink. Never escapes `NotificationPublisher`.
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("{0}")]
    Transport(String),

    #[error("publish endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Failures while preparing a signed AWS request.
#[derive(Error, Debug, Clone)]
pub enum SigningError {
    #[error("AWS credentials not found: set {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}
