use std::net::Ipv4Addr;

use serde::Serialize;

use crate::{config::Config, error::EventError, scalr::InboundEvent};

/// Hosts are always published as address records.
pub const RECORD_TYPE: &str = "A";

// ─────────────────────────────────────────────────────────────────────────────
// DNS manager request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DnsOperation {
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsChangeRequest {
    #[serde(rename = "ServerURL")]
    pub server_url: String,
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Oper")]
    pub oper: DnsOperation,
    #[serde(rename = "Inputs")]
    pub inputs: RecordInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordInputs {
    pub name: String,
    pub content: String,
    #[serde(rename = "Type")]
    pub rtype: String,
}

impl DnsChangeRequest {
    /// Build the record change for the host an event describes.
    pub fn for_event(
        cfg: &Config,
        event: &InboundEvent,
        oper: DnsOperation,
    ) -> Result<Self, EventError> {
        let host = event.data.hostname().ok_or(EventError::MissingHostname)?;
        let address = event.data.address().ok_or(EventError::MissingAddress)?;
        if address.parse::<Ipv4Addr>().is_err() {
            return Err(EventError::InvalidAddress(address.to_string()));
        }

        Ok(Self {
            server_url: cfg.dns_server_url.clone(),
            api_key: cfg.dns_api_key.clone(),
            zone: cfg.zone().to_string(),
            oper,
            inputs: RecordInputs {
                name: record_name(host, cfg.zone()),
                content: address.to_string(),
                rtype: RECORD_TYPE.to_string(),
            },
        })
    }
}

/// `web1` + `example.com` → `web1.example.com`, never with a doubled dot.
pub fn record_name(host: &str, zone: &str) -> String {
    format!("{}.{}", host.trim_end_matches('.'), zone.trim_matches('.'))
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration-management request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum NodeAction {
    /// Serialised as an empty string; the node is left alone.
    #[default]
    #[serde(rename = "")]
    None,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigMgmtRequest {
    pub provider: Provider,
    pub resource: Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provider {
    #[serde(rename = "BaseURL")]
    pub base_url: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SkipSSL")]
    pub skip_ssl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    pub node: Node,
    pub action: NodeAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    pub name: String,
}

impl ConfigMgmtRequest {
    /// Request for the node named after the event's host. The node name is
    /// the bare hostname, without the DNS suffix.
    pub fn for_event(
        cfg: &Config,
        event: &InboundEvent,
        action: NodeAction,
    ) -> Result<Self, EventError> {
        let host = event.data.hostname().ok_or(EventError::MissingHostname)?;
        Ok(Self {
            provider: Provider {
                base_url: cfg.config_mgmt_base_url.clone(),
                name: cfg.admin_identity.clone(),
                skip_ssl: cfg.skip_tls_verify,
            },
            resource: Resource {
                node: Node { name: host.to_string() },
                action,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::scalr::EventData;

    pub(crate) fn test_config() -> Config {
        Config {
            dns_service_url: "http://dns-manager:3001".into(),
            dns_server_url: "http://powerdns:8081".into(),
            dns_api_key: "secret".into(),
            dns_zone_suffix: "example.com".into(),
            config_mgmt_url: "http://chef-relay:3002".into(),
            config_mgmt_base_url: "https://chef/organizations/dev/".into(),
            admin_identity: "chefadmin".into(),
            skip_tls_verify: true,
            listen_port: 3000,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            pool_max_idle_per_host: 8,
            pool_idle_timeout_secs: 90,
        }
    }

    fn event(host: Option<&str>, external: Option<&str>, internal: Option<&str>) -> InboundEvent {
        InboundEvent {
            event_name: "hostup".into(),
            data: EventData {
                server_hostname: host.map(Into::into),
                external_ip: external.map(Into::into),
                internal_ip: internal.map(Into::into),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn dns_request_serialises_to_manager_shape() {
        let ev = event(Some("web1"), Some("1.2.3.4"), None);
        let req = DnsChangeRequest::for_event(&test_config(), &ev, DnsOperation::Create).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "ServerURL": "http://powerdns:8081",
                "APIKey": "secret",
                "Zone": "example.com",
                "Oper": "Create",
                "Inputs": { "Name": "web1.example.com", "Content": "1.2.3.4", "Type": "A" }
            })
        );
    }

    #[test]
    fn content_falls_back_to_internal_ip() {
        let ev = event(Some("web1"), Some(""), Some("10.0.0.5"));
        let req = DnsChangeRequest::for_event(&test_config(), &ev, DnsOperation::Delete).unwrap();
        assert_eq!(req.inputs.content, "10.0.0.5");
        assert_eq!(req.oper, DnsOperation::Delete);
    }

    #[test]
    fn rejects_event_without_address_or_hostname() {
        let cfg = test_config();
        assert_eq!(
            DnsChangeRequest::for_event(&cfg, &event(Some("web1"), Some(""), None), DnsOperation::Create),
            Err(EventError::MissingAddress)
        );
        assert_eq!(
            DnsChangeRequest::for_event(&cfg, &event(Some(" "), Some("1.2.3.4"), None), DnsOperation::Create),
            Err(EventError::MissingHostname)
        );
        assert_eq!(
            DnsChangeRequest::for_event(&cfg, &event(Some("web1"), Some("fe80::1"), None), DnsOperation::Create),
            Err(EventError::InvalidAddress("fe80::1".into()))
        );
    }

    #[test]
    fn dot_only_hostname_never_becomes_a_bare_suffix() {
        let cfg = test_config();
        let ev = event(Some("."), Some("1.2.3.4"), None);
        assert_eq!(
            DnsChangeRequest::for_event(&cfg, &ev, DnsOperation::Create),
            Err(EventError::MissingHostname)
        );
        assert_eq!(
            ConfigMgmtRequest::for_event(&cfg, &ev, NodeAction::Delete),
            Err(EventError::MissingHostname)
        );
    }

    #[test]
    fn record_name_has_exactly_one_separator() {
        assert_eq!(record_name("web1", "example.com"), "web1.example.com");
        assert_eq!(record_name("web1.", ".example.com."), "web1.example.com");

        let mut cfg = test_config();
        cfg.dns_zone_suffix = ".example.com".into();
        let req = DnsChangeRequest::for_event(&cfg, &event(Some("web1"), Some("1.2.3.4"), None), DnsOperation::Create)
            .unwrap();
        assert_eq!(req.inputs.name, "web1.example.com");
        assert_eq!(req.zone, "example.com");
    }

    #[test]
    fn node_delete_uses_bare_hostname() {
        let ev = event(Some("web1"), None, Some("10.0.0.5"));
        let req = ConfigMgmtRequest::for_event(&test_config(), &ev, NodeAction::Delete).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "Provider": {
                    "BaseURL": "https://chef/organizations/dev/",
                    "Name": "chefadmin",
                    "SkipSSL": true
                },
                "Resource": { "Node": { "Name": "web1" }, "Action": "Delete" }
            })
        );
    }

    #[test]
    fn node_action_defaults_to_empty() {
        let v = serde_json::to_value(NodeAction::default()).unwrap();
        assert_eq!(v, json!(""));
    }
}
