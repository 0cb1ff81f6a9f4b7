// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric snapshot to point translation.
//!
//! Derives the field set for each metric kind, drops invalid values,
//! applies the field filter and merges tags. Idle metrics (count unchanged
//! since the previous cycle) are skipped when idle suppression is on.

use crate::config::Precision;
use crate::influx::{FieldSet, FieldValue, Point, TagSet};
use crate::metric::{HistogramSnapshot, MeterSnapshot, MetricSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Derives per-metric tags from the metric key.
pub type Tagger = Arc<dyn Fn(&str) -> TagSet + Send + Sync>;

/// Derives the measurement name from the metric key and its resolved tags.
pub type Namer = Arc<dyn Fn(&str, &TagSet) -> String + Send + Sync>;

/// Decides whether a field is written: `(key, metric, field name, value)`.
pub type FieldFilter =
    Arc<dyn Fn(&str, &MetricSnapshot, &str, &FieldValue) -> bool + Send + Sync>;

/// Field name and (possibly absent) value, in derivation order.
type RawFields = Vec<(&'static str, Option<FieldValue>)>;

/// Last observed count per metric key, used for idle detection.
#[derive(Debug, Default)]
pub struct PreviousValues {
    counts: HashMap<String, i64>,
}

impl PreviousValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `count` equals the last recorded count for `key`.
    /// A first observation is never idle. Non-idle observations are recorded.
    pub fn observe(&mut self, key: &str, count: i64) -> bool {
        match self.counts.get_mut(key) {
            Some(previous) if *previous == count => true,
            Some(previous) => {
                *previous = count;
                false
            }
            None => {
                self.counts.insert(key.to_string(), count);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.counts.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Outcome of translating one metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Skipped: count unchanged since the previous cycle.
    Idle,
    /// Zero or more points to write.
    Points(Vec<Point>),
}

impl Translation {
    pub fn into_points(self) -> Vec<Point> {
        match self {
            Translation::Idle => Vec::new(),
            Translation::Points(points) => points,
        }
    }
}

/// Maps metric snapshots to points.
#[derive(Clone)]
pub struct MetricTranslator {
    global_tags: TagSet,
    tagger: Tagger,
    namer: Namer,
    field_filter: FieldFilter,
    skip_idle_metrics: bool,
    precision: Precision,
}

impl Default for MetricTranslator {
    fn default() -> Self {
        Self::new(TagSet::new(), false, Precision::Nanoseconds)
    }
}

impl MetricTranslator {
    /// Translator with identity namer, empty tagger and accept-all filter.
    pub fn new(global_tags: TagSet, skip_idle_metrics: bool, precision: Precision) -> Self {
        Self {
            global_tags,
            tagger: Arc::new(|_| TagSet::new()),
            namer: Arc::new(|key, _| key.to_string()),
            field_filter: Arc::new(|_, _, _, _| true),
            skip_idle_metrics,
            precision,
        }
    }

    pub fn with_tagger(mut self, tagger: Tagger) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn with_namer(mut self, namer: Namer) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_field_filter(mut self, filter: FieldFilter) -> Self {
        self.field_filter = filter;
        self
    }

    /// Translate one metric snapshot.
    ///
    /// Non-gauge points carry the cycle timestamp `at`; gauge points carry
    /// their own sample timestamps. Metrics whose fields all get filtered
    /// out produce no point.
    pub fn translate(
        &self,
        key: &str,
        snapshot: &MetricSnapshot,
        at: SystemTime,
        previous: &mut PreviousValues,
    ) -> Translation {
        if let MetricSnapshot::Gauge { samples } = snapshot {
            let points = samples
                .iter()
                .filter_map(|sample| {
                    let raw = vec![("count", Some(sample.value.clone()))];
                    let fields = self.accept_fields(key, snapshot, raw);
                    if fields.is_empty() {
                        return None;
                    }
                    Some(self.build_point(
                        key,
                        &sample.tags,
                        fields,
                        self.precision.timestamp(sample.timestamp),
                    ))
                })
                .collect();
            return Translation::Points(points);
        }

        if self.skip_idle_metrics {
            if let Some(count) = snapshot.primary_count() {
                if previous.observe(key, count) {
                    return Translation::Idle;
                }
            }
        }

        let fields = self.accept_fields(key, snapshot, raw_fields(snapshot));
        if fields.is_empty() {
            return Translation::Points(Vec::new());
        }
        let point = self.build_point(key, &TagSet::new(), fields, self.precision.timestamp(at));
        Translation::Points(vec![point])
    }

    /// Keep present, finite values the filter accepts.
    fn accept_fields(&self, key: &str, snapshot: &MetricSnapshot, raw: RawFields) -> FieldSet {
        raw.into_iter()
            .filter_map(|(name, value)| {
                let value = value?;
                if !value.is_finite() {
                    return None;
                }
                if !(self.field_filter)(key, snapshot, name, &value) {
                    return None;
                }
                Some((name.to_string(), Some(value)))
            })
            .collect()
    }

    /// Tag precedence, lowest first: tagger, global tags, extra (sample) tags.
    fn build_point(
        &self,
        key: &str,
        extra_tags: &TagSet,
        fields: FieldSet,
        timestamp: i64,
    ) -> Point {
        let mut tags = (self.tagger)(key);
        tags.extend(self.global_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags.extend(extra_tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        Point {
            measurement: (self.namer)(key, &tags),
            tags,
            fields,
            timestamp: Some(timestamp),
        }
    }
}

fn raw_fields(snapshot: &MetricSnapshot) -> RawFields {
    match snapshot {
        MetricSnapshot::Counter { count } => vec![("count", Some(FieldValue::Integer(*count)))],
        MetricSnapshot::Meter(meter) => meter_fields(meter),
        MetricSnapshot::Histogram(histogram) => {
            let mut fields = vec![("count", Some(FieldValue::Integer(histogram.count)))];
            fields.extend(distribution_fields(histogram));
            fields
        }
        MetricSnapshot::Timer { rate, duration } => {
            let mut fields = meter_fields(rate);
            fields.extend(distribution_fields(duration));
            fields
        }
        MetricSnapshot::Gauge { .. } => Vec::new(),
    }
}

fn meter_fields(meter: &MeterSnapshot) -> RawFields {
    vec![
        ("count", Some(FieldValue::Integer(meter.count))),
        ("one-minute", Some(FieldValue::Float(meter.m1_rate))),
        ("five-minute", Some(FieldValue::Float(meter.m5_rate))),
        ("fifteen-minute", Some(FieldValue::Float(meter.m15_rate))),
        ("mean-rate", Some(FieldValue::Float(meter.mean_rate))),
    ]
}

fn distribution_fields(h: &HistogramSnapshot) -> RawFields {
    let int = |v: Option<i64>| v.map(FieldValue::Integer);
    let float = |v: Option<f64>| v.map(FieldValue::Float);
    vec![
        ("min", int(h.min)),
        ("max", int(h.max)),
        ("sum", int(h.sum)),
        ("mean", float(h.mean)),
        ("variance", float(h.variance)),
        ("std-dev", float(h.std_dev)),
        ("median", float(h.median)),
        ("75-percentile", float(h.p75)),
        ("95-percentile", float(h.p95)),
        ("99-percentile", float(h.p99)),
        ("999-percentile", float(h.p999)),
    ]
}
