// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB metrics reporter.
//!
//! Periodically snapshots in-process metrics, encodes them as InfluxDB
//! Line Protocol and ships them over UDP or HTTP(S).
//!
//! This crate provides:
//! - Line Protocol encoding with byte-wise sorted tags and fields
//! - Metric-to-point translation with idle suppression and field filtering
//! - Batching, and packet packing for the datagram transport
//! - UDP and HTTP(S) transports behind one [`Transport`] trait
//! - A [`Reporter`] with single-flight report cycles and a cancellable schedule
//! - YAML configuration
//!
//! # Overview
//!
//! ```text
//! Metric --> MetricTranslator --> encode_line --> PendingPoints
//!        --> create_batches --> (pack_packets) --> Transport
//! ```
//!
//! # Example
//!
//! ```no_run
//! use metrics_influxdb::{Counter, FlushMode, Reporter, ReporterConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> metrics_influxdb::Result<()> {
//! let reporter = Reporter::new(ReporterConfig::http("127.0.0.1", "telemetry"))?;
//! let requests = Arc::new(Counter::new());
//! reporter.add_metric("http.requests", requests.clone());
//!
//! requests.inc();
//! reporter.report(FlushMode::Immediate).wait().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod influx;
pub mod mapping;
pub mod metric;
pub mod packet;
pub mod recorder;
pub mod summary;
pub mod transport;

pub use config::{Consistency, Precision, Protocol, ReporterConfig};
pub use error::{ConfigError, Error, Result, SerializationError, TransportError};
pub use influx::{encode_line, FieldSet, FieldValue, Point, TagSet};
pub use metric::{Counter, FnMetric, Gauge, GaugeSample, Metric, MetricKind, MetricSnapshot};
pub use recorder::{CycleReport, FlushMode, Reporter, ReporterBuilder};
pub use transport::{Client, Transport};
