use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};

use crate::{
    relay::{self, RelayOutcome, Status},
    scalr::InboundEvent,
    AppState,
};

// ── GET /healthz ──────────────────────────────────────────────────────────────

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

// ── POST / ────────────────────────────────────────────────────────────────────
//
// Scalr webhook. The body is decoded by hand rather than through `Json<_>` so
// that every decode failure is a plain 400 and the Content-Type header is not
// required.
//
//   malformed body          → 400, nothing sent
//   unknown event           → 200 "ignored", nothing sent
//   hostname / IP missing   → 422, nothing sent
//   all dispatches 200      → 200 "relayed"
//   any dispatch failed     → 502 "failed", per-target results in the body

pub async fn receive_event(State(state): State<AppState>, body: Bytes) -> Response {
    let event: InboundEvent = match serde_json::from_slice(&body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("rejecting malformed event body: {e}");
            return error_response(StatusCode::BAD_REQUEST, format!("malformed event body: {e}"));
        }
    };

    let kind = event.kind();
    info!(
        event_id = event.event_id.as_deref().unwrap_or("-"),
        hostname = event.data.hostname().unwrap_or("-"),
        "← {kind} event"
    );

    let requests = match relay::plan(&state.cfg, &event) {
        Ok(r) => r,
        Err(e) => {
            warn!("{kind} event rejected: {e}");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
        }
    };

    if requests.is_empty() {
        info!("{kind}: no downstream action");
        return (StatusCode::OK, Json(RelayOutcome::ignored(&kind))).into_response();
    }

    let reports = relay::dispatch_all(&state.dispatcher, &requests).await;
    let outcome = RelayOutcome::from_reports(&kind, reports);
    let code = match outcome.status {
        Status::Failed => StatusCode::BAD_GATEWAY,
        Status::Relayed | Status::Ignored => StatusCode::OK,
    };
    (code, Json(outcome)).into_response()
}

// ── any other method on / ─────────────────────────────────────────────────────

pub async fn method_not_allowed(method: Method) -> Response {
    warn!("{method} / rejected");
    (
        [(header::ALLOW, "POST")],
        error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{method} is not supported, POST events to /"),
        ),
    )
        .into_response()
}

// ── helpers ───────────────────────────────────────────────────────────────────

pub(crate) fn error_response(code: StatusCode, msg: String) -> Response {
    (code, Json(serde_json::json!({"error": msg}))).into_response()
}
