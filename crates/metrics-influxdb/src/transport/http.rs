// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP(S) transport for the InfluxDB `/write` endpoint.
//!
//! One `POST /write` per batch, body = the batch's lines joined by `\n`.
//! Query parameters carry database, credentials, precision and
//! consistency; unset values are omitted.
//!
//! | status | outcome |
//! |--------|---------|
//! | 204 | success |
//! | 200 | [`TransportError::Server`] with the response body |
//! | 400 | [`TransportError::Syntax`] with the offending payload |
//! | 401 | [`TransportError::Unauthorized`] |
//! | other | [`TransportError::UnknownStatus`] |

use super::{Delivery, Transport};
use crate::config::{Consistency, Precision, Protocol, ReporterConfig};
use crate::error::{ConfigError, TransportError};
use bytes::Bytes;
use reqwest::{Client, StatusCode};

/// Client for the InfluxDB HTTP write API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    protocol: Protocol,
    url: String,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    precision: Option<Precision>,
    consistency: Option<Consistency>,
}

impl HttpClient {
    /// Build the client; the request timeout comes from `http_timeout_ms`.
    pub fn new(config: &ReporterConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        let scheme = match config.protocol {
            Protocol::Https => "https",
            Protocol::Http | Protocol::Udp => "http",
        };

        Ok(Self {
            client,
            protocol: config.protocol,
            url: format!("{}://{}:{}/write", scheme, config.host, config.port()),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            precision: config.precision,
            consistency: config.consistency,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Endpoint URL without query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters for the write request, in a fixed order.
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = Vec::with_capacity(5);
        if let Some(db) = &self.database {
            query.push(("db", db.as_str()));
        }
        if let Some(u) = &self.username {
            query.push(("u", u.as_str()));
        }
        if let Some(p) = &self.password {
            query.push(("p", p.as_str()));
        }
        if let Some(precision) = self.precision {
            query.push(("precision", precision.as_str()));
        }
        if let Some(consistency) = self.consistency {
            query.push(("consistency", consistency.as_str()));
        }
        query
    }

    /// Write one batch.
    pub async fn send(&self, body: String) -> Delivery {
        let payload = Bytes::from(body);
        let response = self
            .client
            .post(&self.url)
            .query(&self.query())
            .body(payload.clone())
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::OK => {
                let body = response.text().await?;
                Err(TransportError::Server { body })
            }
            StatusCode::UNAUTHORIZED => Err(TransportError::Unauthorized),
            StatusCode::BAD_REQUEST => Err(TransportError::Syntax {
                payload: String::from_utf8_lossy(&payload).into_owned(),
            }),
            other => Err(TransportError::UnknownStatus(other.as_u16())),
        }
    }
}

impl Transport for HttpClient {
    async fn write_batches(&self, batches: Vec<Vec<String>>) -> Vec<Delivery> {
        tracing::debug!("HTTP: writing {} batch(es) to {}", batches.len(), self.url);

        let mut outcomes = Vec::with_capacity(batches.len());
        for batch in batches {
            outcomes.push(self.send(batch.join("\n")).await);
        }
        outcomes
    }
}
