use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single weather fetch.
///
/// Callers treat every variant the same way; the split exists for logs.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to weather service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("weather service returned a malformed body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why a refresh cycle ended without a new record.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no location source is enabled")]
    LocationDisabled,

    #[error("location permission denied")]
    PermissionDenied { rationale_shown: bool },

    #[error("location updates ended before a fix arrived")]
    NoFix,

    #[error("network is unavailable")]
    NetworkUnavailable,

    #[error("fetching weather failed: {0}")]
    FetchFailed(#[from] NetworkError),

    #[error("storing weather failed: {0}")]
    CacheWrite(#[source] anyhow::Error),
}

impl RefreshError {
    /// Whether the host showed the user something for this failure.
    pub fn is_user_visible(&self) -> bool {
        match self {
            Self::LocationDisabled | Self::NetworkUnavailable => true,
            Self::PermissionDenied { rationale_shown } => *rationale_shown,
            Self::NoFix | Self::FetchFailed(_) | Self::CacheWrite(_) => false,
        }
    }
}
