// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delivery of encoded batches to the database.
//!
//! # Architecture
//!
//! ```text
//! Transport Trait
//! +-- UdpClient    (one ephemeral datagram socket per packet, fire-and-forget)
//! +-- HttpClient   (one POST /write per batch, status mapped to errors)
//! ```
//!
//! The reporter owns a single transport chosen once from the configured
//! protocol. No transport retries: a failed delivery is reported and the
//! points are gone.

pub mod http;
pub mod udp;

pub use http::HttpClient;
pub use udp::UdpClient;

use crate::config::{Protocol, ReporterConfig};
use crate::error::{ConfigError, TransportError};
use std::future::Future;

/// Outcome of one delivery unit (a packet for UDP, a batch for HTTP).
pub type Delivery = Result<(), TransportError>;

/// Backend-agnostic interface for shipping batches of encoded lines.
pub trait Transport: Send + Sync + 'static {
    /// Deliver every batch, returning one outcome per delivery unit in
    /// send order.
    fn write_batches(
        &self,
        batches: Vec<Vec<String>>,
    ) -> impl Future<Output = Vec<Delivery>> + Send;
}

/// Transport selected from [`ReporterConfig::protocol`].
#[derive(Debug, Clone)]
pub enum Client {
    Udp(UdpClient),
    Http(HttpClient),
}

impl Client {
    /// Build the client for the configured protocol.
    ///
    /// Validates the configuration first so that bad settings fail here
    /// rather than on the first send.
    pub fn from_config(config: &ReporterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        match config.protocol {
            Protocol::Udp => Ok(Client::Udp(UdpClient::new(config))),
            Protocol::Http | Protocol::Https => Ok(Client::Http(HttpClient::new(config)?)),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Client::Udp(_) => Protocol::Udp,
            Client::Http(c) => c.protocol(),
        }
    }
}

impl Transport for Client {
    async fn write_batches(&self, batches: Vec<Vec<String>>) -> Vec<Delivery> {
        match self {
            Client::Udp(c) => c.write_batches(batches).await,
            Client::Http(c) => c.write_batches(batches).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_selected_from_protocol() {
        let udp = Client::from_config(&ReporterConfig::udp("127.0.0.1")).unwrap();
        assert!(matches!(udp, Client::Udp(_)));
        assert_eq!(udp.protocol(), Protocol::Udp);

        let http = Client::from_config(&ReporterConfig::http("127.0.0.1", "db")).unwrap();
        assert!(matches!(http, Client::Http(_)));

        let https = Client::from_config(&ReporterConfig {
            protocol: Protocol::Https,
            ..ReporterConfig::http("127.0.0.1", "db")
        })
        .unwrap();
        assert_eq!(https.protocol(), Protocol::Https);
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = ReporterConfig {
            batch_size: 0,
            ..ReporterConfig::udp("127.0.0.1")
        };
        assert!(matches!(
            Client::from_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }
}
