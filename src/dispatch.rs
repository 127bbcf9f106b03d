use std::fmt;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    error::DispatchError,
    payload::{ConfigMgmtRequest, DnsChangeRequest},
};

// ─────────────────────────────────────────────────────────────────────────────
// Downstream targets
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Dns,
    ConfigManagement,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Dns => f.write_str("dns"),
            Target::ConfigManagement => f.write_str("config-management"),
        }
    }
}

/// A fully built request, ready to be POSTed to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Dns(DnsChangeRequest),
    ConfigMgmt(ConfigMgmtRequest),
}

impl Outbound {
    pub fn target(&self) -> Target {
        match self {
            Outbound::Dns(_) => Target::Dns,
            Outbound::ConfigMgmt(_) => Target::ConfigManagement,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Shared, pooled client for both downstream services. Cloning is cheap and
/// every clone reuses the same connection pool.
#[derive(Clone)]
pub struct Dispatcher {
    http: Client,
    dns_url: String,
    config_mgmt_url: String,
    connect_secs: u64,
    request_secs: u64,
}

impl Dispatcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.request_timeout())
            .connect_timeout(cfg.connect_timeout())
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .pool_idle_timeout(cfg.pool_idle_timeout())
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            dns_url: cfg.dns_service_url.clone(),
            config_mgmt_url: cfg.config_mgmt_url.clone(),
            connect_secs: cfg.connect_timeout_secs,
            request_secs: cfg.request_timeout_secs,
        })
    }

    fn url(&self, target: Target) -> &str {
        match target {
            Target::Dns => &self.dns_url,
            Target::ConfigManagement => &self.config_mgmt_url,
        }
    }

    /// POST one request to its target. Only a 200 counts as delivered.
    pub async fn send(&self, req: &Outbound) -> Result<(), DispatchError> {
        match req {
            Outbound::Dns(body) => {
                info!(
                    "DNS {oper:?} {name} → {content}",
                    oper = body.oper,
                    name = body.inputs.name,
                    content = body.inputs.content
                );
                self.post_json(Target::Dns, body).await
            }
            Outbound::ConfigMgmt(body) => {
                info!(
                    "NODE {action:?} {name}",
                    action = body.resource.action,
                    name = body.resource.node.name
                );
                self.post_json(Target::ConfigManagement, body).await
            }
        }
    }

    async fn post_json<T: Serialize>(&self, target: Target, body: &T) -> Result<(), DispatchError> {
        let url = self.url(target);
        debug!(%target, %url, "POST");

        // `.json()` also sets Content-Type: application/json
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| {
                // Covers both the connect and the total deadline
                if source.is_timeout() {
                    DispatchError::Timeout {
                        target,
                        connect_secs: self.connect_secs,
                        request_secs: self.request_secs,
                    }
                } else {
                    DispatchError::Transport { target, source }
                }
            })?;

        // The response body carries nothing we act on; dropping `resp` discards it.
        let status = resp.status();
        if status != StatusCode::OK {
            error!("{target} POST {url} [{status}]");
            return Err(DispatchError::UnexpectedStatus { target, status });
        }
        debug!(%target, "delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{header, method},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::payload::{tests::test_config, Node, NodeAction, Provider, Resource};

    fn node_delete() -> Outbound {
        Outbound::ConfigMgmt(ConfigMgmtRequest {
            provider: Provider { base_url: "https://chef/".into(), name: "admin".into(), skip_ssl: false },
            resource: Resource { node: Node { name: "web1".into() }, action: NodeAction::Delete },
        })
    }

    fn dispatcher_for(server: &MockServer) -> Dispatcher {
        let mut cfg = test_config();
        cfg.dns_service_url = format!("{}/dns", server.uri());
        cfg.config_mgmt_url = server.uri();
        Dispatcher::new(&cfg).unwrap()
    }

    #[test]
    fn target_names() {
        assert_eq!(Target::Dns.to_string(), "dns");
        assert_eq!(Target::ConfigManagement.to_string(), "config-management");
        assert_eq!(serde_json::to_value(Target::ConfigManagement).unwrap(), "config-management");
    }

    #[tokio::test]
    async fn posts_json_and_accepts_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ignored"))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server);
        dispatcher.send(&node_delete()).await.unwrap();
    }

    #[tokio::test]
    async fn any_status_other_than_200_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = dispatcher_for(&server).send(&node_delete()).await.unwrap_err();
        assert_eq!(err.target(), Target::ConfigManagement);
        assert!(matches!(
            err,
            DispatchError::UnexpectedStatus { status, .. } if status == StatusCode::CREATED
        ));
    }

    #[tokio::test]
    async fn slow_downstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut cfg = test_config();
        cfg.config_mgmt_url = server.uri();
        cfg.request_timeout_secs = 1;
        let err = Dispatcher::new(&cfg).unwrap().send(&node_delete()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { connect_secs: 5, request_secs: 1, .. }));
        let msg = err.to_string();
        assert!(msg.contains("connect limit 5s"), "{msg}");
        assert!(msg.contains("total limit 1s"), "{msg}");
    }

    #[tokio::test]
    async fn unreachable_downstream_is_a_transport_error() {
        let mut cfg = test_config();
        // Reserved port on localhost; nothing listens there.
        cfg.config_mgmt_url = "http://127.0.0.1:1".into();
        let err = Dispatcher::new(&cfg).unwrap().send(&node_delete()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport { target: Target::ConfigManagement, .. }));
    }
}
