// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric sources and the snapshots they produce.
//!
//! Rolling statistics (rates, percentiles) are computed by whichever
//! metrics library owns the instrument; this crate only consumes the
//! resulting [`MetricSnapshot`]. [`Counter`] and [`Gauge`] are provided
//! because their state is trivial, anything else plugs in through
//! [`FnMetric`] or a custom [`Metric`] impl.

use crate::influx::{FieldValue, TagSet};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::SystemTime;

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Meter,
    Histogram,
    Timer,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Meter => "meter",
            Self::Histogram => "histogram",
            Self::Timer => "timer",
            Self::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate statistics of a meter (or of a timer's rate part).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    /// One-minute exponentially weighted rate.
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
    pub mean_rate: f64,
}

/// Distribution statistics of a histogram (or of a timer's duration part).
///
/// Statistics are optional because an empty distribution has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    pub count: i64,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub sum: Option<i64>,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub p999: Option<f64>,
}

/// A single timestamped, tagged value pushed onto a gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub value: FieldValue,
    pub timestamp: SystemTime,
    pub tags: TagSet,
}

impl GaugeSample {
    pub fn new(value: impl Into<FieldValue>, timestamp: SystemTime, tags: TagSet) -> Self {
        Self {
            value: value.into(),
            timestamp,
            tags,
        }
    }
}

/// Point-in-time state of one metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSnapshot {
    Counter { count: i64 },
    Meter(MeterSnapshot),
    Histogram(HistogramSnapshot),
    Timer {
        rate: MeterSnapshot,
        duration: HistogramSnapshot,
    },
    /// Samples drained from the gauge queue for this cycle.
    Gauge { samples: Vec<GaugeSample> },
}

impl MetricSnapshot {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter { .. } => MetricKind::Counter,
            Self::Meter(_) => MetricKind::Meter,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Timer { .. } => MetricKind::Timer,
            Self::Gauge { .. } => MetricKind::Gauge,
        }
    }

    /// Count used for idle detection. Gauges have none.
    pub fn primary_count(&self) -> Option<i64> {
        match self {
            Self::Counter { count } => Some(*count),
            Self::Meter(m) => Some(m.count),
            Self::Histogram(h) => Some(h.count),
            Self::Timer { rate, .. } => Some(rate.count),
            Self::Gauge { .. } => None,
        }
    }
}

/// A metric source tracked by the reporter.
pub trait Metric: Send + Sync {
    /// Capture the current state. For gauges this drains the sample queue.
    fn snapshot(&self) -> MetricSnapshot;

    /// Access to the concrete type, e.g. to reset a counter from a
    /// metric-reported hook.
    fn as_any(&self) -> &dyn Any;
}

/// Monotonic-ish counter that can also be decremented or cleared.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Metric for Counter {
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::Counter {
            count: self.count(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Gauge holding a queue of samples between report cycles.
///
/// Every cycle drains the whole queue; samples pushed while a drain is in
/// progress land in the next cycle.
#[derive(Debug, Default)]
pub struct Gauge {
    samples: Mutex<VecDeque<GaugeSample>>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value stamped with the current time.
    pub fn set(&self, value: impl Into<FieldValue>) {
        self.set_with_tags(value, TagSet::new());
    }

    /// Record a value with per-sample tags.
    pub fn set_with_tags(&self, value: impl Into<FieldValue>, tags: TagSet) {
        self.push(GaugeSample::new(value, SystemTime::now(), tags));
    }

    /// Record a fully specified sample.
    pub fn push(&self, sample: GaugeSample) {
        self.samples.lock().push_back(sample);
    }

    /// Take every sample queued right now.
    pub fn drain(&self) -> Vec<GaugeSample> {
        let taken = std::mem::take(&mut *self.samples.lock());
        taken.into()
    }

    /// Drop queued samples without reporting them.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

impl Metric for Gauge {
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::Gauge {
            samples: self.drain(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adapter for snapshots computed elsewhere.
///
/// ```
/// use metrics_influxdb::metric::{FnMetric, MeterSnapshot, MetricSnapshot};
///
/// let meter = FnMetric::new(|| MetricSnapshot::Meter(MeterSnapshot {
///     count: 3,
///     ..Default::default()
/// }));
/// # let _ = meter;
/// ```
pub struct FnMetric<F> {
    snapshot: F,
}

impl<F> FnMetric<F>
where
    F: Fn() -> MetricSnapshot + Send + Sync + 'static,
{
    pub fn new(snapshot: F) -> Self {
        Self { snapshot }
    }
}

impl<F> Metric for FnMetric<F>
where
    F: Fn() -> MetricSnapshot + Send + Sync + 'static,
{
    fn snapshot(&self) -> MetricSnapshot {
        (self.snapshot)()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<F> fmt::Debug for FnMetric<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMetric").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_counter_snapshot() {
        let c = Counter::new();
        c.inc();
        c.inc_by(4);
        c.dec();
        assert_eq!(c.snapshot(), MetricSnapshot::Counter { count: 4 });
        assert_eq!(c.snapshot().primary_count(), Some(4));

        c.clear();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn test_gauge_drain_takes_everything() {
        let g = Gauge::new();
        g.set(10i64);
        g.set(15i64);
        assert_eq!(g.len(), 2);

        let MetricSnapshot::Gauge { samples } = g.snapshot() else {
            panic!("expected gauge snapshot");
        };
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, FieldValue::Integer(10));
        assert_eq!(samples[1].value, FieldValue::Integer(15));
        assert!(g.is_empty());
    }

    #[test]
    fn test_gauge_samples_after_drain_kept_for_next_cycle() {
        let g = Arc::new(Gauge::new());
        g.push(GaugeSample::new(1i64, UNIX_EPOCH, TagSet::new()));

        let first = g.drain();
        g.push(GaugeSample::new(
            2i64,
            UNIX_EPOCH + Duration::from_secs(1),
            TagSet::new(),
        ));

        assert_eq!(first.len(), 1);
        let second = g.drain();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].timestamp, UNIX_EPOCH + Duration::from_secs(1));
    }

    #[test]
    fn test_fn_metric_and_downcast() {
        let m: Arc<dyn Metric> = Arc::new(FnMetric::new(|| {
            MetricSnapshot::Histogram(HistogramSnapshot {
                count: 2,
                ..Default::default()
            })
        }));
        assert_eq!(m.snapshot().kind(), MetricKind::Histogram);
        assert_eq!(m.snapshot().primary_count(), Some(2));

        let c: Arc<dyn Metric> = Arc::new(Counter::new());
        assert!(c.as_any().downcast_ref::<Counter>().is_some());
        assert!(c.as_any().downcast_ref::<Gauge>().is_none());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MetricKind::Timer.to_string(), "timer");
        let gauge = MetricSnapshot::Gauge { samples: vec![] };
        assert_eq!(gauge.kind(), MetricKind::Gauge);
        assert_eq!(gauge.primary_count(), None);
    }
}
