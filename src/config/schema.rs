//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Root configuration for the replica router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Logical database name -> replication layout.
    pub databases: BTreeMap<String, ReplicationConfig>,

    /// Probe and reconnection settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// One writer plus its readers for a single logical database.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReplicationConfig {
    /// The mandatory writer. Kept optional here so a missing writer is reported
    /// as a configuration error instead of a parse error.
    pub writer: Option<NodeConfig>,

    /// Readers, in registration order.
    pub readers: Vec<NodeConfig>,
}

impl ReplicationConfig {
    /// Create a layout with the given writer and no readers.
    pub fn with_writer(writer: NodeConfig) -> Self {
        Self {
            writer: Some(writer),
            readers: Vec::new(),
        }
    }

    /// Append a reader.
    pub fn reader(mut self, reader: NodeConfig) -> Self {
        self.readers.push(reader);
        self
    }
}

/// Connection descriptor for a single node.
///
/// Only `host` and `port` are interpreted by the router; the rest is handed
/// to the connector unchanged.
#[derive(Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub database: String,

    #[serde(default = "default_sslmode")]
    pub sslmode: String,

    /// e.g. "Europe/Berlin".
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,

    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: u32,

    /// 0 means connections are reused forever.
    #[serde(default)]
    pub conn_max_lifetime_secs: u64,

    /// Log every statement at info level instead of debug.
    #[serde(default)]
    pub log_query: bool,

    /// Statements slower than this are logged at warn level (0 disables it).
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

fn default_sslmode() -> String {
    "disable".to_string()
}

fn default_max_open_conns() -> u32 {
    40
}

fn default_max_idle_conns() -> u32 {
    8
}

fn default_slow_query_threshold_ms() -> u64 {
    200
}

impl NodeConfig {
    /// Create a descriptor with defaults for everything but the address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            sslmode: default_sslmode(),
            timezone: None,
            max_open_conns: default_max_open_conns(),
            max_idle_conns: default_max_idle_conns(),
            conn_max_lifetime_secs: 0,
            log_query: false,
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
        }
    }

    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }

    /// Display name used in logs and lookups.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection string for drivers that accept the key=value form.
    pub fn dsn(&self) -> String {
        let mut dsn = format!(
            "host={} port={} user={} password={} dbname={} sslmode={}",
            self.host, self.port, self.user, self.password, self.database, self.sslmode
        );
        if let Some(tz) = &self.timezone {
            dsn.push_str(&format!(" TimeZone={}", tz));
        }
        dsn
    }

    /// Same as [`dsn`](Self::dsn) with the password masked, safe for logs.
    pub fn redacted_dsn(&self) -> String {
        let mut redacted = self.clone();
        if !redacted.password.is_empty() {
            redacted.password = "p***".to_string();
        }
        redacted.dsn()
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("sslmode", &self.sslmode)
            .field("timezone", &self.timezone)
            .field("max_open_conns", &self.max_open_conns)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("conn_max_lifetime_secs", &self.conn_max_lifetime_secs)
            .field("log_query", &self.log_query)
            .field("slow_query_threshold_ms", &self.slow_query_threshold_ms)
            .finish()
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Pause between two passes of the reconnection loop, in milliseconds.
    pub reconnect_interval_ms: u64,

    /// Deadline for a single probe, in milliseconds. Must stay well below the
    /// reconnect interval.
    pub probe_timeout_ms: u64,
}

impl HealthCheckConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 4_000,
            probe_timeout_ms: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Interval of the periodic status log in seconds (0 disables it).
    pub status_log_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            status_log_interval_secs: 0,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let raw = r#"
            [databases.admin.writer]
            host = "db-w"
            port = 5432

            [[databases.admin.readers]]
            host = "db-r1"
            port = 5433
            password = "secret"
        "#;
        let config: RouterConfig = toml::from_str(raw).unwrap();
        let admin = &config.databases["admin"];
        assert_eq!(admin.writer.as_ref().unwrap().address(), "db-w:5432");
        assert_eq!(admin.readers.len(), 1);
        assert_eq!(admin.readers[0].max_open_conns, 40);
        assert_eq!(admin.readers[0].slow_query_threshold_ms, 200);
        assert!(!admin.readers[0].log_query);
        assert_eq!(config.health_check.reconnect_interval_ms, 4_000);
    }

    #[test]
    fn password_is_redacted() {
        let mut node = NodeConfig::new("localhost", 5432);
        node.password = "hunter2".into();
        assert!(node.dsn().contains("hunter2"));
        assert!(!node.redacted_dsn().contains("hunter2"));
        assert!(!format!("{:?}", node).contains("hunter2"));
    }
}
