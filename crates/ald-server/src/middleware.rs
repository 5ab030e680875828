//! Request plumbing shared by every route: request ids, bearer auth, and a
//! per-client request budget.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "ALD_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
/// Expired windows are pruned once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 1024;

/// Request id, stored as a request extension and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn of(req: &Request) -> String {
        req.extensions()
            .get::<Self>()
            .map_or_else(|| "unknown".to_owned(), |id| id.0.clone())
    }
}

/// Bearer tokens accepted on protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads `ALD_API_KEYS` (comma-separated bearer tokens).
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// Without keys, auth is off in development and startup fails elsewhere.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if keys.is_empty() && !is_development {
            anyhow::bail!("{API_KEYS_VAR} must list at least one bearer token outside development");
        }
        if keys.is_empty() {
            tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development");
        }

        Ok(Self {
            enabled: !keys.is_empty(),
            api_keys: Arc::new(keys),
        })
    }

    /// Compares against every key in constant time per key.
    fn allows(&self, token: &str) -> bool {
        self.api_keys.iter().fold(false, |found, key| {
            found | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
        })
    }
}

/// Who a request is charged to.
///
/// User routes are charged to the user and session routes to the session,
/// so one client's notification polling cannot starve another's search.
/// Everything else falls back to the bearer token, then to a shared bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ClientKey {
    User(String),
    Session(String),
    Token(String),
    Anonymous,
}

impl ClientKey {
    /// Log label; bearer tokens are never rendered.
    fn label(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Session(id) => format!("session:{id}"),
            Self::Token(_) => "token".to_owned(),
            Self::Anonymous => "anonymous".to_owned(),
        }
    }

    fn of(req: &Request) -> Self {
        let mut segments = req.uri().path().trim_matches('/').split('/');
        let scoped = match (segments.next(), segments.next(), segments.next()) {
            (Some("api"), Some("v1"), Some("users")) => {
                segments.next().map(|id| Self::User(id.to_owned()))
            }
            (Some("api"), Some("v1"), Some("search")) => {
                match (segments.next(), segments.next()) {
                    (Some("sessions"), Some(id)) => Some(Self::Session(id.to_owned())),
                    _ => None,
                }
            }
            _ => None,
        };

        scoped
            .or_else(|| {
                bearer_token(req.headers().get(header::AUTHORIZATION))
                    .map(|token| Self::Token(token.to_owned()))
            })
            .unwrap_or(Self::Anonymous)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request budget, tracked separately per [`ClientKey`].
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<ClientKey, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Charges one request to `key`. `Err` carries the time until the
    /// client's window resets.
    async fn charge(&self, key: ClientKey, now: Instant) -> Result<(), Duration> {
        let mut clients = self.clients.lock().await;
        if clients.len() >= PRUNE_THRESHOLD {
            clients.retain(|_, w| now.saturating_duration_since(w.started_at) < self.window);
        }

        let window = clients.entry(key).or_insert(Window {
            started_at: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(window.started_at);
        if elapsed >= self.window {
            *window = Window {
                started_at: now,
                count: 0,
            };
        }

        if window.count >= self.max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }
        window.count += 1;
        Ok(())
    }
}

/// Reuses a well-formed incoming `x-request-id`, otherwise mints a `UUIDv4`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match bearer_token(req.headers().get(header::AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            tracing::debug!(path = %req.uri().path(), "rejected request without valid bearer token");
            ApiError::new(
                RequestId::of(&req),
                "unauthorized",
                "missing or invalid bearer token",
            )
            .into_response()
        }
    }
}

/// Answers 429 with `Retry-After` once the caller's window is spent.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = ClientKey::of(&req);
    match rate_limit.charge(key.clone(), Instant::now()).await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %key.label(), "rate limit exceeded");
            let mut res = ApiError::new(RequestId::of(&req), "rate_limited", "rate limit exceeded")
                .into_response();
            let secs = retry_after.as_secs().max(1);
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            res
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is
/// matched case-insensitively.
fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = value?.to_str().ok()?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
