use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Endpoint of the DNS manager that receives change requests
    pub dns_service_url: String,

    /// PowerDNS API the DNS manager should talk to (`ServerURL` in the payload)
    pub dns_server_url: String,

    /// API key forwarded to the DNS manager (`APIKey` in the payload)
    pub dns_api_key: String,

    /// Zone managed for hosts, also appended to every record name
    pub dns_zone_suffix: String,

    /// Endpoint of the configuration-management service
    pub config_mgmt_url: String,

    /// Organisation URL of the configuration-management server
    pub config_mgmt_base_url: String,

    /// Admin client name used against the configuration-management server
    pub admin_identity: String,

    /// Tell config management to skip TLS verification of its server
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub listen_port: u16,

    /// Total time budget for one outbound request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    /// Parse from environment variables (DNS_SERVICE_URL, DNS_API_KEY, …)
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = envy::from_env::<Config>().context("reading configuration from environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same as [`Config::from_env`] but from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let cfg = envy::from_iter::<_, Config>(vars).context("reading configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("DNS_SERVICE_URL", &self.dns_service_url),
            ("DNS_SERVER_URL", &self.dns_server_url),
            ("DNS_API_KEY", &self.dns_api_key),
            ("CONFIG_MGMT_URL", &self.config_mgmt_url),
            ("CONFIG_MGMT_BASE_URL", &self.config_mgmt_base_url),
            ("ADMIN_IDENTITY", &self.admin_identity),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        if self.zone().is_empty() {
            bail!("DNS_ZONE_SUFFIX must name a zone");
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            bail!("outbound timeouts must be at least one second");
        }
        Ok(())
    }

    /// The zone suffix without surrounding dots.
    pub fn zone(&self) -> &str {
        self.dns_zone_suffix.trim().trim_matches('.')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

fn default_port()              -> u16   { 3000 }
fn default_request_timeout()   -> u64   { 10 }
fn default_connect_timeout()   -> u64   { 5 }
fn default_pool_max_idle()     -> usize { 8 }
fn default_pool_idle_timeout() -> u64   { 90 }
