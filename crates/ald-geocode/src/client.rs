//! HTTP client for the Google Geocoding JSON API.
//!
//! The API answers HTTP 200 for most outcomes and reports the real result in
//! the body's `status` field; both layers are mapped onto [`GeocodeError`].

use std::time::Duration;

use ald_core::GeoPoint;
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::retry::retry_with_backoff;
use crate::types::{GeocodeResponse, Geocoder};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const GEOCODE_PATH: &str = "maps/api/geocode/json";

/// Google Geocoding client.
///
/// Built without an API key it stays usable but every lookup fails with
/// [`GeocodeError::Disabled`], which callers treat as "no reference point".
pub struct GoogleGeocoder {
    client: Client,
    api_key: Option<String>,
    endpoint: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish_non_exhaustive()
    }
}

impl GoogleGeocoder {
    /// Creates a client pointed at the production Google endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom API origin (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/{GEOCODE_PATH}", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint,
            max_retries: 1,
            backoff_base_ms: 500,
        })
    }

    /// Overrides the retry policy for transient failures.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_url(&self, api_key: &str, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", api_key);
        url
    }

    async fn request_once(&self, url: &Url) -> Result<Option<GeoPoint>, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::QuotaExceeded(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: "geocode response".to_owned(),
                source: e,
            })?;

        interpret_response(parsed)
    }
}

/// Maps the body-level `status` onto a result.
fn interpret_response(response: GeocodeResponse) -> Result<Option<GeoPoint>, GeocodeError> {
    let GeocodeResponse {
        status,
        results,
        error_message,
    } = response;

    match status.as_str() {
        "OK" => Ok(results
            .first()
            .and_then(|r| GeoPoint::checked(r.geometry.location.lat, r.geometry.location.lng))),
        "ZERO_RESULTS" => Ok(None),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(GeocodeError::QuotaExceeded(
            error_message.unwrap_or_else(|| status.clone()),
        )),
        _ => Err(GeocodeError::ApiError {
            status: status.clone(),
            message: error_message.unwrap_or_else(|| "no error message".to_owned()),
        }),
    }
}

impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeocodeError::Disabled);
        };
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        let url = self.build_url(api_key, address);
        let url = &url;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || {
            self.request_once(url)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> GoogleGeocoder {
        GoogleGeocoder::with_base_url(Some("test-key".to_owned()), 30, "ald-test", base_url)
            .expect("client construction should not fail")
    }

    fn response(value: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(value).expect("wire type")
    }

    #[test]
    fn build_url_encodes_address_and_key() {
        let client = test_client("https://maps.googleapis.com/");
        let url = client.build_url("test-key", "12 Harbor Way, Baltimore & Co");
        assert!(url
            .as_str()
            .starts_with("https://maps.googleapis.com/maps/api/geocode/json?address="));
        assert!(
            url.as_str().contains("Baltimore+%26+Co"),
            "address should be form-encoded: {url}"
        );
        assert!(url.as_str().ends_with("&key=test-key"));
    }

    #[test]
    fn blank_api_key_disables_client() {
        let client =
            GoogleGeocoder::with_base_url(Some("  ".to_owned()), 30, "ald-test", DEFAULT_BASE_URL)
                .expect("client");
        assert!(!client.is_enabled());
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = test_client(DEFAULT_BASE_URL);
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("test-key"));
    }

    #[test]
    fn ok_status_takes_first_result() {
        let parsed = interpret_response(response(serde_json::json!({
            "status": "OK",
            "results": [
                { "geometry": { "location": { "lat": 39.29, "lng": -76.61 } } },
                { "geometry": { "location": { "lat": 1.0, "lng": 1.0 } } }
            ]
        })))
        .expect("ok");
        assert_eq!(parsed, Some(GeoPoint::new(39.29, -76.61)));
    }

    #[test]
    fn ok_status_with_out_of_range_location_is_no_result() {
        let parsed = interpret_response(response(serde_json::json!({
            "status": "OK",
            "results": [ { "geometry": { "location": { "lat": 120.0, "lng": 0.0 } } } ]
        })))
        .expect("ok");
        assert_eq!(parsed, None);
    }

    #[test]
    fn zero_results_is_none() {
        let parsed =
            interpret_response(response(serde_json::json!({ "status": "ZERO_RESULTS" })))
                .expect("ok");
        assert_eq!(parsed, None);
    }

    #[test]
    fn over_query_limit_is_quota_error() {
        let err = interpret_response(response(serde_json::json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "You have exceeded your daily request quota"
        })))
        .unwrap_err();
        assert!(matches!(err, GeocodeError::QuotaExceeded(ref m) if m.contains("daily")));
    }

    #[test]
    fn request_denied_is_api_error() {
        let err = interpret_response(response(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .unwrap_err();
        assert!(matches!(err, GeocodeError::ApiError { ref status, .. } if status == "REQUEST_DENIED"));
    }
}
