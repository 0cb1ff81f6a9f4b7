// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.
//!
//! Configuration errors are fatal at construction. Serialization errors
//! are fatal for one point only. Transport errors are reported to the
//! error handler (or logged) and never retried.

use thiserror::Error;

/// Invalid configuration, detected when the reporter or a client is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Precision must be one of [n,u,ms,s,m,h], got '{0}'")]
    InvalidPrecision(String),

    #[error("Consistency must be one of [one,quorum,all,any], got '{0}'")]
    InvalidConsistency(String),

    #[error("Protocol must be one of [udp,http,https], got '{0}'")]
    InvalidProtocol(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client build error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A point that cannot be written as a Line Protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("point '{measurement}' has no fields")]
    NoFields { measurement: String },

    #[error("field '{key}' is NaN or infinite")]
    NonFiniteField { key: String },

    #[error("value of '{key}' contains a newline")]
    NewlineInValue { key: String },
}

/// Failure to deliver a packet or batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve host '{host}': {reason}")]
    Resolve { host: String, reason: String },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("problem with request: {body}")]
    Server { body: String },

    #[error("unauthorized user")]
    Unauthorized,

    #[error("invalid syntax")]
    Syntax { payload: String },

    #[error("unknown response status: {0}")]
    UnknownStatus(u16),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no tokio runtime available to drive the reporter")]
    NoRuntime,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
