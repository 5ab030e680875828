//! Search-session routes.
//!
//! A session is the server-side counterpart of one facility browser view.
//! Every route answers with the session's current [`SearchView`].

use std::sync::Arc;

use ald_core::GeoPoint;
use ald_search::{resolve_reference_point, FilterState, SearchSession, SearchView};
use ald_store::FacilityStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_store_error, ApiError, ApiResponse, AppState, LastSeen, SessionEntry, SharedSession,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CreateSessionRequest {
    pub query: Option<String>,
    pub filters: Option<FilterState>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionResponse {
    pub session_id: Uuid,
    pub view: SearchView,
}

type SessionResult = Result<Json<ApiResponse<SessionResponse>>, ApiError>;

async fn find_session(
    state: &AppState,
    session_id: Uuid,
    request_id: &str,
) -> Result<SharedSession, ApiError> {
    let entry = state
        .sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or_else(|| ApiError::new(request_id, "not_found", "search session not found"))?;
    entry.last_seen.touch().await;
    Ok(entry.session)
}

async fn render(
    session_id: Uuid,
    session: &SharedSession,
    request_id: String,
) -> Json<ApiResponse<SessionResponse>> {
    let view = session.lock().await.view();
    ApiResponse::new(SessionResponse { session_id, view }, request_id)
}

/// Applies `query` and waits for its geocode. A stale result is dropped by
/// the session; the response always reflects the latest state.
async fn apply_query(state: &AppState, session: &SharedSession, query: &str) {
    let ticket = session.lock().await.set_query(query);
    if let Some(ticket) = ticket {
        resolve_reference_point(session, state.geocoder.as_ref(), ticket).await;
    }
}

/// POST /api/v1/search/sessions
///
/// Open a session over the current facility list.
pub(super) async fn create_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let Json(body) = body.unwrap_or_default();
    let facilities = state
        .backend
        .list_facilities()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let mut session = SearchSession::with_page_size(facilities, state.page_size);
    if let Some(filters) = body.filters {
        session.set_filters(filters);
    }
    let session: SharedSession = Arc::new(Mutex::new(session));
    if let Some(query) = body.query.as_deref() {
        apply_query(&state, &session, query).await;
    }

    let session_id = Uuid::new_v4();
    state
        .sessions
        .write()
        .await
        .insert(
            session_id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: LastSeen::default(),
            },
        );
    tracing::info!(%session_id, "search session created");

    Ok((
        StatusCode::CREATED,
        render(session_id, &session, req_id.0).await,
    ))
}

/// GET /api/v1/search/sessions/:session_id
pub(super) async fn get_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    Ok(render(session_id, &session, req_id.0).await)
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedSession {
    pub session_id: Uuid,
    pub deleted: bool,
}

/// DELETE /api/v1/search/sessions/:session_id
pub(super) async fn delete_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedSession>>, ApiError> {
    if state.sessions.write().await.remove(&session_id).is_none() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "search session not found",
        ));
    }
    Ok(ApiResponse::new(
        DeletedSession {
            session_id,
            deleted: true,
        },
        req_id.0,
    ))
}

/// PUT /api/v1/search/sessions/:session_id/query
pub(super) async fn set_query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<QueryRequest>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    apply_query(&state, &session, &body.query).await;
    Ok(render(session_id, &session, req_id.0).await)
}

/// PUT /api/v1/search/sessions/:session_id/filters
pub(super) async fn set_filters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
    Json(filters): Json<FilterState>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    session.lock().await.set_filters(filters);
    Ok(render(session_id, &session, req_id.0).await)
}

/// PUT /api/v1/search/sessions/:session_id/location
///
/// Device geolocation.
pub(super) async fn set_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<LocationRequest>,
) -> SessionResult {
    let Some(point) = GeoPoint::checked(body.lat, body.lng) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "lat must be within [-90, 90] and lng within [-180, 180]",
        ));
    };
    let session = find_session(&state, session_id, &req_id.0).await?;
    session.lock().await.set_user_location(point);
    Ok(render(session_id, &session, req_id.0).await)
}

/// DELETE /api/v1/search/sessions/:session_id/location
pub(super) async fn reset_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    session.lock().await.reset_reference_point();
    Ok(render(session_id, &session, req_id.0).await)
}

/// POST /api/v1/search/sessions/:session_id/more
pub(super) async fn load_more(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    session.lock().await.load_more();
    Ok(render(session_id, &session, req_id.0).await)
}

/// POST /api/v1/search/sessions/:session_id/select/:index
///
/// Selecting a facility without coordinates leaves the map where it is.
pub(super) async fn select_facility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> SessionResult {
    let session = find_session(&state, session_id, &req_id.0).await?;
    session.lock().await.select_facility(index);
    Ok(render(session_id, &session, req_id.0).await)
}
