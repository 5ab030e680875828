//! HTTP client for the facility-directory REST backend.
//!
//! Facilities live under `/ALD_database`, users under `/users`. Non-2xx
//! responses become typed [`StoreError`]s; bodies are decoded into the
//! lenient [`Facility`] record.

use std::time::Duration;

use ald_core::{Facility, GeoPoint};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::StoreError;
use crate::store::{FacilityStore, FacilityWriter, UserStore};

const FACILITIES_PATH: &str = "ALD_database";
const USERS_PATH: &str = "users";
const SAVED_PATH: &str = "saved";

/// Client for the document-store REST backend.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

/// One entry of a saved list: either a bare id or a full facility snapshot.
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedEntry {
    Id(String),
    Snapshot(Box<Facility>),
}

impl BackendClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidBaseUrl`] if `base_url` is not an absolute
    ///   `http`/`https` URL.
    /// - [`StoreError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, StoreError> {
        let parsed = Url::parse(base_url).map_err(|e| StoreError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "expected an http or https URL".to_owned(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a request and maps non-2xx statuses onto [`StoreError`].
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, StoreError> {
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StoreError> {
        let context = url.to_string();
        let body = self.send(Method::GET, url, None).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Deserialize { context, source: e })
    }
}

impl FacilityStore for BackendClient {
    async fn list_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        let facilities: Vec<Facility> = self.get_json(self.endpoint(&[FACILITIES_PATH])).await?;
        tracing::debug!(count = facilities.len(), "loaded facilities from backend");
        Ok(facilities)
    }

    async fn get_facility(&self, id: &str) -> Result<Facility, StoreError> {
        self.get_json(self.endpoint(&[FACILITIES_PATH, id])).await
    }
}

impl FacilityWriter for BackendClient {
    async fn update_coordinates(&self, id: &str, point: GeoPoint) -> Result<(), StoreError> {
        let url = self.endpoint(&[FACILITIES_PATH, id]);
        let body = json!({ "lat": point.lat, "lng": point.lng });
        self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }
}

impl UserStore for BackendClient {
    async fn saved_facilities(&self, user_id: &str) -> Result<Vec<Facility>, StoreError> {
        let entries: Vec<SavedEntry> = self
            .get_json(self.endpoint(&[USERS_PATH, user_id, SAVED_PATH]))
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                SavedEntry::Id(id) => Facility::new(id),
                SavedEntry::Snapshot(facility) => *facility,
            })
            .collect())
    }

    async fn add_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        let url = self.endpoint(&[USERS_PATH, user_id, SAVED_PATH]);
        let body = json!({ "facilityId": facility_id });
        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn remove_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        let url = self.endpoint(&[USERS_PATH, user_id, SAVED_PATH, facility_id]);
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> BackendClient {
        BackendClient::new(base_url, 30, "ald-test").expect("client construction should not fail")
    }

    #[test]
    fn endpoint_appends_segments_to_root() {
        let client = test_client("http://localhost:3000");
        let url = client.endpoint(&[FACILITIES_PATH, "abc"]);
        assert_eq!(url.as_str(), "http://localhost:3000/ALD_database/abc");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = test_client("https://api.example.com/v2/");
        let url = client.endpoint(&[USERS_PATH, "u1", SAVED_PATH]);
        assert_eq!(url.as_str(), "https://api.example.com/v2/users/u1/saved");
    }

    #[test]
    fn endpoint_percent_encodes_ids() {
        let client = test_client("http://localhost:3000");
        let url = client.endpoint(&[FACILITIES_PATH, "a/b c"]);
        assert_eq!(url.as_str(), "http://localhost:3000/ALD_database/a%2Fb%20c");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = BackendClient::new("mailto:ops@example.com", 30, "ald-test").unwrap_err();
        assert!(matches!(err, StoreError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = BackendClient::new("not a url", 30, "ald-test").unwrap_err();
        assert!(matches!(err, StoreError::InvalidBaseUrl { .. }));
    }
}
