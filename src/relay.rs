//! Classification and fan-out: which downstream actions an event triggers,
//! building their payloads, and sending them.

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    config::Config,
    dispatch::{Dispatcher, Outbound, Target},
    error::EventError,
    payload::{ConfigMgmtRequest, DnsChangeRequest, DnsOperation, NodeAction},
    scalr::{EventKind, InboundEvent},
};

/// One downstream side effect of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Dns(DnsOperation),
    DeleteNode,
}

/// What each kind of event triggers, in dispatch order.
pub fn actions_for(kind: &EventKind) -> &'static [Action] {
    match kind {
        EventKind::HostUp => &[Action::Dns(DnsOperation::Create)],
        EventKind::HostDown => &[Action::Dns(DnsOperation::Delete), Action::DeleteNode],
        EventKind::Other(_) => &[],
    }
}

/// Build every request an event calls for. Either all of them build or none
/// are returned, so an invalid event never reaches a downstream service.
pub fn plan(cfg: &Config, event: &InboundEvent) -> Result<Vec<Outbound>, EventError> {
    actions_for(&event.kind())
        .iter()
        .map(|action| match *action {
            Action::Dns(oper) => DnsChangeRequest::for_event(cfg, event, oper).map(Outbound::Dns),
            Action::DeleteNode => {
                ConfigMgmtRequest::for_event(cfg, event, NodeAction::Delete).map(Outbound::ConfigMgmt)
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome reporting
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub target: Target,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Relayed,
    Ignored,
    Failed,
}

/// Body returned to Scalr for every decodable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayOutcome {
    pub event: String,
    pub status: Status,
    pub dispatches: Vec<DispatchReport>,
}

impl RelayOutcome {
    pub fn ignored(kind: &EventKind) -> Self {
        Self { event: kind.to_string(), status: Status::Ignored, dispatches: vec![] }
    }

    pub fn from_reports(kind: &EventKind, dispatches: Vec<DispatchReport>) -> Self {
        let status = if dispatches.iter().all(|d| d.ok) { Status::Relayed } else { Status::Failed };
        Self { event: kind.to_string(), status, dispatches }
    }
}

/// Send every request concurrently. A failure is recorded against its own
/// target and never stops the others.
pub async fn dispatch_all(dispatcher: &Dispatcher, requests: &[Outbound]) -> Vec<DispatchReport> {
    let results = join_all(requests.iter().map(|req| dispatcher.send(req))).await;

    requests
        .iter()
        .zip(results)
        .map(|(req, result)| match result {
            Ok(()) => {
                info!(target_service = %req.target(), "dispatch ok");
                DispatchReport { target: req.target(), ok: true, error: None }
            }
            Err(e) => {
                error!(target_service = %req.target(), "dispatch failed: {e}");
                DispatchReport { target: req.target(), ok: false, error: Some(e.to_string()) }
            }
        })
        .collect()
}
