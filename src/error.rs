use thiserror::Error;

/// Failures talking to the prediction backend.
///
/// The dashboard never shows these details to the user: history failures
/// degrade to the fallback series and write failures collapse to a generic
/// notice. They are kept typed so logs say what actually went wrong.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
