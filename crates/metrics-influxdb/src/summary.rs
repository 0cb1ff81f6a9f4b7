// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot summaries produced by an external metrics library.
//!
//! The summary is a JSON object keyed by namespace, then metric name:
//!
//! ```json
//! {
//!   "http": {
//!     "requests": { "type": "counter", "count": 12 },
//!     "latency": {
//!       "type": "timer",
//!       "rate": { "count": 12, "m1": 0.2, "m5": 0.1, "m15": 0.05, "mean": 0.3 },
//!       "duration": { "min": 3, "max": 40, "sum": 180, "mean": 15.0, "p99": 39.5 }
//!     },
//!     "queue": {
//!       "type": "gauge",
//!       "points": [{ "value": 4, "timestamp": 1700000000000, "tags": { "shard": "a" } }]
//!     }
//!   }
//! }
//! ```
//!
//! Each metric becomes a `("namespace.metric", MetricSnapshot)` pair.
//! Missing or `null` statistics stay absent and are never written.

use crate::influx::{FieldValue, TagSet};
use crate::metric::{GaugeSample, HistogramSnapshot, MeterSnapshot, MetricSnapshot};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, UNIX_EPOCH};

type Summary = BTreeMap<String, BTreeMap<String, SummaryEntry>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SummaryEntry {
    Counter {
        #[serde(default)]
        count: i64,
    },
    Meter(RawMeter),
    Histogram(RawHistogram),
    Timer {
        #[serde(default)]
        rate: RawMeter,
        #[serde(default)]
        duration: RawHistogram,
    },
    Gauge {
        #[serde(default)]
        points: Vec<RawPoint>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMeter {
    count: i64,
    m1: Option<f64>,
    m5: Option<f64>,
    m15: Option<f64>,
    mean: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHistogram {
    count: i64,
    min: Option<f64>,
    max: Option<f64>,
    sum: Option<f64>,
    mean: Option<f64>,
    variance: Option<f64>,
    std_dev: Option<f64>,
    median: Option<f64>,
    p75: Option<f64>,
    p95: Option<f64>,
    p99: Option<f64>,
    p999: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    value: RawValue,
    /// Epoch milliseconds.
    timestamp: u64,
    #[serde(default)]
    tags: TagSet,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<RawValue> for FieldValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Boolean(v) => FieldValue::Boolean(v),
            RawValue::Integer(v) => FieldValue::Integer(v),
            RawValue::Float(v) => FieldValue::Float(v),
            RawValue::String(v) => FieldValue::String(v),
        }
    }
}

impl From<RawMeter> for MeterSnapshot {
    /// Missing rates become NaN, which the translator drops.
    fn from(raw: RawMeter) -> Self {
        MeterSnapshot {
            count: raw.count,
            m1_rate: raw.m1.unwrap_or(f64::NAN),
            m5_rate: raw.m5.unwrap_or(f64::NAN),
            m15_rate: raw.m15.unwrap_or(f64::NAN),
            mean_rate: raw.mean.unwrap_or(f64::NAN),
        }
    }
}

impl From<RawHistogram> for HistogramSnapshot {
    fn from(raw: RawHistogram) -> Self {
        let int = |v: Option<f64>| v.filter(|v| v.is_finite()).map(|v| v.round() as i64);
        HistogramSnapshot {
            count: raw.count,
            min: int(raw.min),
            max: int(raw.max),
            sum: int(raw.sum),
            mean: raw.mean,
            variance: raw.variance,
            std_dev: raw.std_dev,
            median: raw.median,
            p75: raw.p75,
            p95: raw.p95,
            p99: raw.p99,
            p999: raw.p999,
        }
    }
}

impl From<SummaryEntry> for MetricSnapshot {
    fn from(entry: SummaryEntry) -> Self {
        match entry {
            SummaryEntry::Counter { count } => MetricSnapshot::Counter { count },
            SummaryEntry::Meter(meter) => MetricSnapshot::Meter(meter.into()),
            SummaryEntry::Histogram(histogram) => MetricSnapshot::Histogram(histogram.into()),
            SummaryEntry::Timer { rate, duration } => MetricSnapshot::Timer {
                rate: rate.into(),
                duration: duration.into(),
            },
            SummaryEntry::Gauge { points } => MetricSnapshot::Gauge {
                samples: points
                    .into_iter()
                    .map(|p| {
                        GaugeSample::new(
                            FieldValue::from(p.value),
                            UNIX_EPOCH + Duration::from_millis(p.timestamp),
                            p.tags,
                        )
                    })
                    .collect(),
            },
        }
    }
}

/// Parse a summary into `(key, snapshot)` pairs, ordered by key.
pub fn parse_summary(json: &str) -> Result<Vec<(String, MetricSnapshot)>, serde_json::Error> {
    let summary: Summary = serde_json::from_str(json)?;
    Ok(summary
        .into_iter()
        .flat_map(|(namespace, metrics)| {
            metrics.into_iter().map(move |(name, entry)| {
                (format!("{}.{}", namespace, name), MetricSnapshot::from(entry))
            })
        })
        .collect())
}
