use thiserror::Error;

/// Errors returned by geocoding providers.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client. The request
    /// URL is stripped because its query string carries the API key.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("unexpected HTTP status {status} from geocoding API")]
    UnexpectedStatus { status: u16 },

    /// The provider's request quota is spent. Never retried.
    #[error("geocoding quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The provider rejected the request (`REQUEST_DENIED`, `INVALID_REQUEST`, ...).
    #[error("geocoding API error {status}: {message}")]
    ApiError { status: String, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No API key is configured, so no request can be made.
    #[error("geocoding is disabled: no API key configured")]
    Disabled,

    #[error("invalid geocoding base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}
