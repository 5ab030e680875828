//! Per-user change-watch routes: mount, teardown, notifications, dismiss.

use std::sync::Arc;

use ald_watch::{ChangeWatcher, Notification, WatchBoard, WatchPhase};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, LastSeen, WatchEntry};

#[derive(Debug, Serialize)]
pub(super) struct WatchStatus {
    pub user_id: String,
    pub mounted: bool,
    pub phase: WatchPhase,
    pub completed_cycles: u64,
    pub notification_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct DismissResult {
    pub id: Uuid,
    pub dismissed: bool,
}

async fn status(user_id: String, board: &WatchBoard) -> WatchStatus {
    WatchStatus {
        user_id,
        mounted: board.is_mounted().await,
        phase: board.phase().await,
        completed_cycles: board.completed_cycles().await,
        notification_count: board.notifications().await.len(),
    }
}

async fn find_board(
    state: &AppState,
    user_id: &str,
    request_id: &str,
) -> Result<WatchBoard, ApiError> {
    let (board, last_seen) = state
        .watches
        .lock()
        .await
        .get(user_id)
        .map(|entry| (entry.handle.board().clone(), entry.last_seen.clone()))
        .ok_or_else(|| ApiError::new(request_id, "not_found", "no active watch for user"))?;
    last_seen.touch().await;
    Ok(board)
}

/// POST /api/v1/users/:user_id/watch
///
/// Mount a watcher (idempotent).
pub(super) async fn start_watch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<WatchStatus>>), ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "user_id must not be blank",
        ));
    }

    let mut watches = state.watches.lock().await;
    if let Some(entry) = watches.get(&user_id) {
        let board = entry.handle.board().clone();
        let last_seen = entry.last_seen.clone();
        drop(watches);
        last_seen.touch().await;
        let data = status(user_id, &board).await;
        return Ok((StatusCode::OK, ApiResponse::new(data, req_id.0)));
    }

    let watcher = ChangeWatcher::new(
        Arc::clone(&state.backend),
        Arc::clone(&state.backend),
        user_id.clone(),
        &state.watch_options,
    );
    let handle = watcher.spawn();
    let board = handle.board().clone();
    watches.insert(
        user_id.clone(),
        WatchEntry {
            handle,
            last_seen: LastSeen::default(),
        },
    );
    drop(watches);
    tracing::info!(%user_id, "watch mounted");

    let data = status(user_id, &board).await;
    Ok((StatusCode::CREATED, ApiResponse::new(data, req_id.0)))
}

/// DELETE /api/v1/users/:user_id/watch
///
/// Tear the watcher down.
pub(super) async fn stop_watch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<WatchStatus>>, ApiError> {
    let handle = state
        .watches
        .lock()
        .await
        .remove(&user_id)
        .map(|entry| entry.handle);
    let Some(handle) = handle else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "no active watch for user",
        ));
    };

    let board = handle.board().clone();
    handle.shutdown().await;
    tracing::info!(%user_id, "watch torn down");

    let data = status(user_id, &board).await;
    Ok(ApiResponse::new(data, req_id.0))
}

/// GET /api/v1/users/:user_id/notifications
///
/// Newest first.
pub(super) async fn list_notifications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let board = find_board(&state, &user_id, &req_id.0).await?;
    Ok(ApiResponse::new(board.notifications().await, req_id.0))
}

/// DELETE /api/v1/users/:user_id/notifications/:notification_id
pub(super) async fn dismiss_notification(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, notification_id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<DismissResult>>, ApiError> {
    let board = find_board(&state, &user_id, &req_id.0).await?;
    if !board.dismiss(notification_id).await {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "notification not found",
        ));
    }
    Ok(ApiResponse::new(
        DismissResult {
            id: notification_id,
            dismissed: true,
        },
        req_id.0,
    ))
}
