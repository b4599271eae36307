use thiserror::Error;

use crate::models::response::ResponseStatus;

/// Errors raised before, during or after a single send.
///
/// Delivery failures reported by FCM itself are not errors: they come back as a
/// [`ResponseStatus`] with `ok == false`.
#[derive(Error, Debug)]
pub enum FcmError {
    #[error("Failed to serialize FCM payload: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Failed to authenticate with FCM: {0}")]
    Auth(String),

    #[error("Invalid FCM configuration: {0}")]
    Config(String),

    #[error("FCM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse FCM response (HTTP {}): {source}", status.status_code)]
    Parse {
        status: Box<ResponseStatus>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid Retry-After value: {0}")]
    Format(String),

    #[error("Target not supported by the v1 API: {0}")]
    UnsupportedTarget(String),
}

impl FcmError {
    /// Whatever was captured before a response body failed to parse.
    pub fn partial_status(&self) -> Option<&ResponseStatus> {
        match self {
            FcmError::Parse { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl From<gcp_auth::Error> for FcmError {
    fn from(err: gcp_auth::Error) -> Self {
        FcmError::Auth(err.to_string())
    }
}
