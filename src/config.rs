use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: &str = "8080";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.thinq.com";

/// Process configuration, sourced from an optional `config/local` file and
/// then from unprefixed environment variables (`PORT`, `TOKEN`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default = "default_relays_path")]
    pub relays_path: PathBuf,
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    #[serde(default = "default_upstream_connect_timeout_secs")]
    pub upstream_connect_timeout_secs: u64,
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            port: default_port(),
            token: None,
            account_id: None,
            relays_path: default_relays_path(),
            upstream_base_url: default_upstream_base_url(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            upstream_connect_timeout_secs: default_upstream_connect_timeout_secs(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_relays_path() -> PathBuf {
    PathBuf::from("relays.csv")
}

fn default_upstream_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

const fn default_upstream_timeout_secs() -> u64 {
    30
}

const fn default_upstream_connect_timeout_secs() -> u64 {
    10
}

const fn default_drain_timeout_secs() -> u64 {
    30
}

impl RelayConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(None)
    }

    /// Loads configuration, reading variables from `env` instead of the
    /// process environment when provided.
    pub fn load_with_env(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::default().source(env))
            .build()?
            .try_deserialize()
    }

    /// Empty or whitespace-only values count as unset.
    pub fn token(&self) -> Option<&str> {
        non_blank(self.token.as_deref())
    }

    pub fn account_id(&self) -> Option<&str> {
        non_blank(self.account_id.as_deref())
    }

    /// Accepts IPv4 and IPv6 hosts; an empty `PORT` falls back to 8080.
    pub fn listen_addr(&self) -> crate::error::Result<SocketAddr> {
        let host = self.listen_host.trim();
        let ip: IpAddr = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|err| crate::err!("invalid listen host `{host}`: {err}"))?;

        let port = match self.port.trim() {
            "" => DEFAULT_PORT,
            value => value,
        };
        let port: u16 = port
            .parse()
            .map_err(|err| crate::err!("invalid listen port `{port}`: {err}"))?;

        Ok(SocketAddr::new(ip, port))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = RelayConfig::load_with_env(Some(HashMap::new())).expect("config loads");

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.relays_path, PathBuf::from("relays.csv"));
        assert_eq!(config.upstream_base_url, DEFAULT_UPSTREAM_BASE_URL);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.token(), None);
        assert_eq!(config.account_id(), None);
    }

    #[test]
    fn reads_unprefixed_variables() {
        let config = RelayConfig::load_with_env(Some(env(&[
            ("PORT", "9090"),
            ("TOKEN", "dXNlcjpzZWNyZXQ="),
            ("ACCOUNT_ID", "12345"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ])))
        .expect("config loads");

        assert_eq!(config.token(), Some("dXNlcjpzZWNyZXQ="));
        assert_eq!(config.account_id(), Some("12345"));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.listen_addr().expect("listen addr"),
            "0.0.0.0:9090".parse::<SocketAddr>().expect("socket addr")
        );
    }

    #[test]
    fn blank_credentials_count_as_unset() {
        let config = RelayConfig::load_with_env(Some(env(&[("TOKEN", "  "), ("ACCOUNT_ID", "1")])))
            .expect("config loads");

        assert_eq!(config.token(), None);
        assert_eq!(config.account_id(), Some("1"));
    }

    #[test]
    fn ipv6_hosts_are_accepted() {
        for host in ["::", "[::1]"] {
            let config = RelayConfig {
                listen_host: host.to_string(),
                port: "9090".to_string(),
                ..RelayConfig::default()
            };

            let addr = config.listen_addr().expect("listen addr");
            assert!(addr.is_ipv6(), "{host} should bind an IPv6 address");
            assert_eq!(addr.port(), 9090);
        }
    }

    #[test]
    fn invalid_host_is_rejected() {
        let config = RelayConfig {
            listen_host: "not-an-ip".to_string(),
            ..RelayConfig::default()
        };

        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn empty_port_falls_back_to_default() {
        let config = RelayConfig {
            port: String::new(),
            listen_host: "127.0.0.1".to_string(),
            ..RelayConfig::default()
        };

        assert_eq!(
            config.listen_addr().expect("listen addr").port(),
            8080,
            "empty PORT should use the default"
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        let config = RelayConfig {
            port: "not-a-port".to_string(),
            ..RelayConfig::default()
        };

        assert!(config.listen_addr().is_err());
    }
}
