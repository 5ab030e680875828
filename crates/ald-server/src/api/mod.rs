mod idle;
mod search;
mod watch;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ald_geocode::GoogleGeocoder;
use ald_search::SearchSession;
use ald_store::{BackendClient, StoreError};
use ald_watch::{WatchOptions, WatcherHandle};
use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

pub use idle::{LastSeen, Reclaimed, SessionEntry, WatchEntry};

pub type SharedSession = Arc<Mutex<SearchSession>>;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub geocoder: Arc<GoogleGeocoder>,
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    pub watches: Arc<Mutex<HashMap<String, WatchEntry>>>,
    pub page_size: usize,
    pub watch_options: WatchOptions,
    pub idle_ttl: Duration,
}

impl AppState {
    pub fn new(
        backend: BackendClient,
        geocoder: GoogleGeocoder,
        page_size: usize,
        watch_options: WatchOptions,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            geocoder: Arc::new(geocoder),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            watches: Arc::new(Mutex::new(HashMap::new())),
            page_size,
            watch_options,
            idle_ttl,
        }
    }

    /// Tears down every running watcher.
    pub async fn shutdown_watches(&self) {
        let handles: Vec<WatcherHandle> = self
            .watches
            .lock()
            .await
            .drain()
            .map(|(_, entry)| entry.handle)
            .collect();
        tracing::info!(count = handles.len(), "stopping watchers");
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    geocoding: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    if error.is_not_found() {
        return ApiError::new(request_id, "not_found", "record not found in backend");
    }
    tracing::error!(error = %error, "backend request failed");
    ApiError::new(request_id, "upstream_error", "facility backend request failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/search/sessions", post(search::create_session))
        .route(
            "/api/v1/search/sessions/{session_id}",
            get(search::get_session).delete(search::delete_session),
        )
        .route(
            "/api/v1/search/sessions/{session_id}/query",
            put(search::set_query),
        )
        .route(
            "/api/v1/search/sessions/{session_id}/filters",
            put(search::set_filters),
        )
        .route(
            "/api/v1/search/sessions/{session_id}/location",
            put(search::set_location).delete(search::reset_location),
        )
        .route(
            "/api/v1/search/sessions/{session_id}/more",
            post(search::load_more),
        )
        .route(
            "/api/v1/search/sessions/{session_id}/select/{index}",
            post(search::select_facility),
        )
        .route(
            "/api/v1/users/{user_id}/watch",
            post(watch::start_watch).delete(watch::stop_watch),
        )
        .route(
            "/api/v1/users/{user_id}/notifications",
            get(watch::list_notifications),
        )
        .route(
            "/api/v1/users/{user_id}/notifications/{notification_id}",
            delete(watch::dismiss_notification),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let geocoding = if state.geocoder.is_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    ApiResponse::new(
        HealthData {
            status: "ok",
            geocoding,
        },
        req_id.0,
    )
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
