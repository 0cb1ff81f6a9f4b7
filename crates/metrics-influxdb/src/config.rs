// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reporter configuration.
//!
//! Built programmatically or loaded from YAML. Every field has a default;
//! [`ReporterConfig::validate`] rejects values outside their domain so that
//! bad settings surface at construction rather than mid-send.

use crate::error::ConfigError;
use crate::influx::TagSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default InfluxDB HTTP API port.
pub const DEFAULT_HTTP_PORT: u16 = 8086;

/// Default InfluxDB UDP listener port.
pub const DEFAULT_UDP_PORT: u16 = 8089;

/// Timestamp precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    #[serde(rename = "n")]
    Nanoseconds,
    #[serde(rename = "u")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    /// Query-string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanoseconds => "n",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    /// Convert a wall-clock instant to an integer timestamp in this unit.
    /// Instants before the epoch clamp to zero.
    pub fn timestamp(&self, at: SystemTime) -> i64 {
        let since = at.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let value = match self {
            Self::Nanoseconds => since.as_nanos(),
            Self::Microseconds => since.as_micros(),
            Self::Milliseconds => since.as_millis(),
            Self::Seconds => u128::from(since.as_secs()),
            Self::Minutes => u128::from(since.as_secs() / 60),
            Self::Hours => u128::from(since.as_secs() / 3600),
        };
        i64::try_from(value).unwrap_or(i64::MAX)
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" => Ok(Self::Nanoseconds),
            "u" => Ok(Self::Microseconds),
            "ms" => Ok(Self::Milliseconds),
            "s" => Ok(Self::Seconds),
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            other => Err(ConfigError::InvalidPrecision(other.to_string())),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write consistency level (clustered InfluxDB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    One,
    Quorum,
    All,
    Any,
}

impl Consistency {
    /// Query-string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Quorum => "quorum",
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

impl FromStr for Consistency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" => Ok(Self::One),
            "quorum" => Ok(Self::Quorum),
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            other => Err(ConfigError::InvalidConsistency(other.to_string())),
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire protocol used to reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Udp,
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Port used when none is configured.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Udp => DEFAULT_UDP_PORT,
            Self::Http | Self::Https => DEFAULT_HTTP_PORT,
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(Self::Udp),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(ConfigError::InvalidProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReporterConfig {
    /// Database host name or address.
    pub host: String,
    /// Port; `None` selects the protocol default (8086 HTTP, 8089 UDP).
    pub port: Option<u16>,
    /// Target database (required for HTTP).
    pub database: Option<String>,
    /// User name passed through as `u`.
    pub username: Option<String>,
    /// Password passed through as `p`.
    pub password: Option<String>,
    /// Timestamp precision; `None` means nanoseconds.
    pub precision: Option<Precision>,
    /// Write consistency level.
    pub consistency: Option<Consistency>,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Maximum lines per batch.
    pub batch_size: usize,
    /// Maximum datagram payload in bytes (UDP only).
    pub max_packet_size: usize,
    /// HTTP request timeout in milliseconds.
    pub http_timeout_ms: u64,
    /// Buffered reports flush once more than this many lines are pending.
    pub buffer_size: usize,
    /// Tags added to every point.
    pub tags: TagSet,
    /// Skip counters, meters, histograms and timers whose count did not change.
    pub skip_idle_metrics: bool,
    /// Start periodic reporting at build time with this period.
    pub schedule_interval_ms: Option<u64>,
    /// Upper bound on UDP sockets open at the same time.
    pub max_open_sockets: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            database: None,
            username: None,
            password: None,
            precision: None,
            consistency: None,
            protocol: Protocol::Http,
            batch_size: 100,
            max_packet_size: 1024,
            http_timeout_ms: 5000,
            buffer_size: 0,
            tags: TagSet::new(),
            skip_idle_metrics: false,
            schedule_interval_ms: None,
            max_open_sockets: 16,
        }
    }
}

impl ReporterConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// UDP configuration pointed at `host`.
    pub fn udp(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            protocol: Protocol::Udp,
            ..Default::default()
        }
    }

    /// HTTP configuration for `database` on `host`.
    pub fn http(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: Some(database.into()),
            protocol: Protocol::Http,
            ..Default::default()
        }
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Effective precision.
    pub fn precision(&self) -> Precision {
        self.precision.unwrap_or(Precision::Nanoseconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn schedule_interval(&self) -> Option<Duration> {
        self.schedule_interval_ms.map(Duration::from_millis)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == Some(0) {
            return Err(ConfigError::Invalid("port must not be 0".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if self.max_packet_size == 0 {
            return Err(ConfigError::Invalid(
                "max_packet_size must be positive".into(),
            ));
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "http_timeout_ms must be positive".into(),
            ));
        }
        if self.max_open_sockets == 0 {
            return Err(ConfigError::Invalid(
                "max_open_sockets must be positive".into(),
            ));
        }
        if self.schedule_interval_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "schedule_interval_ms must be positive".into(),
            ));
        }
        if self.protocol != Protocol::Udp
            && self.database.as_deref().map_or(true, |db| db.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "database is required for protocol {}",
                self.protocol
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_YAML: &str = r#"
host: "influx.example.com"
port: 9086
database: "telemetry"
username: "writer"
password: "secret"
precision: "ms"
consistency: "quorum"
protocol: "https"
batch_size: 500
http_timeout_ms: 2000
buffer_size: 50
tags:
  env: prod
  host: web-1
skip_idle_metrics: true
schedule_interval_ms: 10000
"#;

    #[test]
    fn test_defaults() {
        let config = ReporterConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.port(), 8086);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_packet_size, 1024);
        assert_eq!(config.buffer_size, 0);
        assert_eq!(config.precision(), Precision::Nanoseconds);
        assert!(!config.skip_idle_metrics);

        assert_eq!(ReporterConfig::udp("localhost").port(), 8089);
    }

    #[test]
    fn test_parse_all_fields() {
        let config = ReporterConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        assert_eq!(config.host, "influx.example.com");
        assert_eq!(config.port(), 9086);
        assert_eq!(config.database.as_deref(), Some("telemetry"));
        assert_eq!(config.username.as_deref(), Some("writer"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.precision, Some(Precision::Milliseconds));
        assert_eq!(config.consistency, Some(Consistency::Quorum));
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.max_packet_size, 1024);
        assert_eq!(config.http_timeout(), Duration::from_secs(2));
        assert_eq!(config.buffer_size, 50);
        assert_eq!(config.tags.get("env").map(String::as_str), Some("prod"));
        assert!(config.skip_idle_metrics);
        assert_eq!(config.schedule_interval(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_yaml_round_trip_of_defaults() {
        let config = ReporterConfig::udp("10.0.0.1");
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ReporterConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_precision_rejected() {
        let err = ReporterConfig::from_yaml("protocol: udp\nprecision: weeks\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        assert!(matches!(
            "weeks".parse::<Precision>(),
            Err(ConfigError::InvalidPrecision(p)) if p == "weeks"
        ));
        assert_eq!("u".parse::<Precision>().unwrap(), Precision::Microseconds);
    }

    #[test]
    fn test_invalid_consistency_rejected() {
        assert!(matches!(
            "most".parse::<Consistency>(),
            Err(ConfigError::InvalidConsistency(_))
        ));
        assert_eq!("any".parse::<Consistency>().unwrap(), Consistency::Any);
        assert!(matches!(
            "tcp".parse::<Protocol>(),
            Err(ConfigError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_validate_domains() {
        let ok = ReporterConfig::http("localhost", "db");
        assert!(ok.validate().is_ok());

        let cases = [
            ReporterConfig { batch_size: 0, ..ok.clone() },
            ReporterConfig { max_packet_size: 0, ..ok.clone() },
            ReporterConfig { http_timeout_ms: 0, ..ok.clone() },
            ReporterConfig { port: Some(0), ..ok.clone() },
            ReporterConfig { host: " ".into(), ..ok.clone() },
            ReporterConfig { schedule_interval_ms: Some(0), ..ok.clone() },
            ReporterConfig { max_open_sockets: 0, ..ok.clone() },
            ReporterConfig { database: None, ..ok.clone() },
        ];
        for case in cases {
            assert!(
                matches!(case.validate(), Err(ConfigError::Invalid(_))),
                "expected rejection: {:?}",
                case
            );
        }

        assert!(ReporterConfig::udp("localhost").validate().is_ok());
    }

    #[test]
    fn test_precision_timestamp() {
        let at = UNIX_EPOCH + Duration::from_millis(7_200_123);
        assert_eq!(Precision::Nanoseconds.timestamp(at), 7_200_123_000_000);
        assert_eq!(Precision::Microseconds.timestamp(at), 7_200_123_000);
        assert_eq!(Precision::Milliseconds.timestamp(at), 7_200_123);
        assert_eq!(Precision::Seconds.timestamp(at), 7_200);
        assert_eq!(Precision::Minutes.timestamp(at), 120);
        assert_eq!(Precision::Hours.timestamp(at), 2);
        assert_eq!(Precision::Seconds.timestamp(UNIX_EPOCH), 0);
    }
}
