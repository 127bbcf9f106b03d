//! Relays Scalr host lifecycle webhooks to a DNS manager and to
//! configuration management.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod payload;
pub mod relay;
pub mod scalr;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{config::Config, dispatch::Dispatcher};

/// Largest webhook body accepted, both by the handler and by the logging
/// middleware that buffers ahead of it.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let dispatcher = Dispatcher::new(&cfg)?;
        Ok(Self { cfg: Arc::new(cfg), dispatcher })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/",        post(handlers::receive_event).fallback(handlers::method_not_allowed))
        .route("/healthz", get(handlers::healthz))
        // log_request_body runs before handlers; only logs at DEBUG level
        .layer(middleware::from_fn(log_request_body))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request body logging middleware
//
// Only active at DEBUG level or below. Reads the body into memory, up to
// MAX_BODY_BYTES (413 beyond that),
// logs it, then puts it back so the actual handler can still deserialise it.
// ─────────────────────────────────────────────────────────────────────────────

async fn log_request_body(req: Request, next: Next) -> Response {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();

    let bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!("request body over {MAX_BODY_BYTES} bytes, rejecting");
            return handlers::error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {MAX_BODY_BYTES} bytes"),
            );
        }
        Err(e) => {
            tracing::error!("failed to read request body: {e}");
            return next.run(Request::from_parts(parts, Body::empty())).await;
        }
    };

    let body_str = std::str::from_utf8(&bytes)
        .map(|s| {
            // Pretty-print if it's valid JSON, otherwise show raw
            serde_json::from_str::<serde_json::Value>(s)
                .map(|v| serde_json::to_string_pretty(&v).unwrap_or_else(|_| s.to_string()))
                .unwrap_or_else(|_| s.to_string())
        })
        .unwrap_or_else(|_| format!("<{} binary bytes>", bytes.len()));

    debug!(
        method = %parts.method,
        path   = %parts.uri.path(),
        body   = %body_str,
        "← request body"
    );

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
