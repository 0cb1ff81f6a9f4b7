// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reporter: the report cycle, flushing and periodic scheduling.
//!
//! One cycle snapshots every tracked metric in registration order,
//! translates each snapshot into points, encodes them into the pending
//! buffer and, when the flush gate passes, hands the batched lines to the
//! transport on a spawned task. The buffer is cleared before the send is
//! spawned, so a slow or unreachable database loses points instead of
//! stalling the cycle.

use crate::buffer::{create_batches, PendingPoints};
use crate::config::ReporterConfig;
use crate::error::{ConfigError, Error, TransportError};
use crate::influx::{FieldValue, TagSet};
use crate::mapping::{MetricTranslator, PreviousValues, Translation};
use crate::metric::{Metric, MetricSnapshot};
use crate::transport::{Client, Transport};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Called once per reported metric with its key and source.
pub type MetricReportedHook = Arc<dyn Fn(&str, &dyn Metric) + Send + Sync>;

/// Receives every failed delivery. Without one, failures are logged.
pub type TransportErrorHandler = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Whether a cycle honours the `buffer_size` gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Flush only once more than `buffer_size` lines are pending.
    Buffered,
    /// Flush whatever is pending at the end of the cycle.
    Immediate,
}

/// Outcome of one call to [`Reporter::report`].
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Lines appended to the pending buffer by this cycle.
    pub points: usize,
    /// Lines handed to the transport by this cycle.
    pub flushed: usize,
    /// Background send, when a flush happened.
    pub delivery: Option<JoinHandle<()>>,
    skipped: bool,
}

impl CycleReport {
    /// Report of a cycle that did not run because another was in progress.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Wait for the background send, if any, to finish.
    pub async fn wait(self) {
        if let Some(delivery) = self.delivery {
            if let Err(e) = delivery.await {
                warn!("InfluxDB delivery task failed: {}", e);
            }
        }
    }
}

struct Inner<T> {
    config: ReporterConfig,
    translator: MetricTranslator,
    transport: Arc<T>,
    metrics: RwLock<Vec<(String, Arc<dyn Metric>)>>,
    /// Lines awaiting flush. Never held while user callbacks run.
    pending: Mutex<PendingPoints>,
    /// Idle table, touched only by the cycle itself.
    previous: Mutex<PreviousValues>,
    reporting: AtomicBool,
    cycles: AtomicU64,
    on_metric_reported: Option<MetricReportedHook>,
    on_transport_error: Option<TransportErrorHandler>,
    schedule: Mutex<Option<JoinHandle<()>>>,
}

/// Releases the single-flight flag on every exit path of a cycle.
struct ReportingGuard<'a>(&'a AtomicBool);

impl Drop for ReportingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic metric reporter.
///
/// Cheap to clone; clones share metrics, buffers and schedule.
pub struct Reporter<T: Transport = Client> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Reporter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Reporter<Client> {
    /// Start building a reporter for `config`.
    pub fn builder(config: ReporterConfig) -> ReporterBuilder {
        ReporterBuilder::new(config)
    }

    /// Reporter with default hooks and the transport selected by
    /// `config.protocol`.
    pub fn new(config: ReporterConfig) -> Result<Self, Error> {
        ReporterBuilder::new(config).build()
    }
}

impl<T: Transport> Reporter<T> {
    /// Reporter with default hooks shipping through `transport`.
    pub fn with_transport(config: ReporterConfig, transport: T) -> Result<Self, Error> {
        ReporterBuilder::new(config).build_with_transport(transport)
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.inner.config
    }

    /// Track `metric` under `key`. Re-adding a key replaces the source and
    /// keeps its position in the report order.
    pub fn add_metric(&self, key: impl Into<String>, metric: Arc<dyn Metric>) {
        let key = key.into();
        let mut metrics = self.inner.metrics.write();
        match metrics.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = metric,
            None => metrics.push((key, metric)),
        }
    }

    /// Source tracked under `key`.
    pub fn metric(&self, key: &str) -> Option<Arc<dyn Metric>> {
        self.inner
            .metrics
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, m)| Arc::clone(m))
    }

    /// Tracked keys in report order.
    pub fn metric_keys(&self) -> Vec<String> {
        self.inner.metrics.read().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Copy of the lines waiting for the next flush.
    pub fn pending_lines(&self) -> Vec<String> {
        self.inner.pending.lock().lines().to_vec()
    }

    /// Number of cycles that ran to completion.
    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles.load(Ordering::Acquire)
    }

    /// Run one report cycle.
    ///
    /// Returns [`CycleReport::skipped`] without touching any state when
    /// another cycle is in progress.
    pub fn report(&self, mode: FlushMode) -> CycleReport {
        if self.inner.reporting.swap(true, Ordering::AcqRel) {
            debug!("InfluxDB report skipped: previous cycle still running");
            return CycleReport::skipped();
        }
        let _guard = ReportingGuard(&self.inner.reporting);

        let at = SystemTime::now();
        let metrics = self.inner.metrics.read().clone();
        let mut points = 0;

        for (key, metric) in &metrics {
            let snapshot = metric.snapshot();
            if !self.queue_points(key, &snapshot, at, &mut points) {
                continue;
            }
            if let Some(hook) = &self.inner.on_metric_reported {
                hook(key, metric.as_ref());
            }
        }

        let lines = {
            let mut pending = self.inner.pending.lock();
            let gate_open = match mode {
                FlushMode::Immediate => true,
                FlushMode::Buffered => pending.exceeds(self.inner.config.buffer_size),
            };
            if gate_open {
                pending.take()
            } else {
                Vec::new()
            }
        };

        let flushed = lines.len();
        let delivery = self.dispatch(lines);
        self.inner.cycles.fetch_add(1, Ordering::AcqRel);

        CycleReport {
            points,
            flushed,
            delivery,
            skipped: false,
        }
    }

    /// Send everything pending now, regardless of the buffer gate.
    pub fn flush(&self) -> Option<JoinHandle<()>> {
        let lines = self.inner.pending.lock().take();
        self.dispatch(lines)
    }

    /// Translate and encode one snapshot into the pending buffer.
    /// Returns false when the metric was idle and skipped.
    ///
    /// The tagger, namer and field filter run with only the idle table
    /// locked, so they may call back into the reporter.
    fn queue_points(
        &self,
        key: &str,
        snapshot: &MetricSnapshot,
        at: SystemTime,
        points: &mut usize,
    ) -> bool {
        let translation = {
            let mut previous = self.inner.previous.lock();
            self.inner.translator.translate(key, snapshot, at, &mut previous)
        };
        let Translation::Points(translated) = translation else {
            return false;
        };

        let mut lines = Vec::with_capacity(translated.len());
        for point in translated {
            match point.to_line() {
                Ok(line) => lines.push(line),
                Err(e) => warn!("Dropping point for metric '{}': {}", key, e),
            }
        }

        *points += lines.len();
        let mut pending = self.inner.pending.lock();
        for line in lines {
            pending.push(line);
        }
        true
    }

    /// Batch `lines` and spawn the send. Failures go to the error handler.
    fn dispatch(&self, lines: Vec<String>) -> Option<JoinHandle<()>> {
        if lines.is_empty() {
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime; dropping {} InfluxDB line(s)", lines.len());
            return None;
        };

        let line_count = lines.len();
        let batches = create_batches(lines, self.inner.config.batch_size);
        debug!(
            "Flushing {} line(s) in {} batch(es) over {}",
            line_count,
            batches.len(),
            self.inner.config.protocol
        );

        let transport = Arc::clone(&self.inner.transport);
        let on_error = self.inner.on_transport_error.clone();
        Some(runtime.spawn(async move {
            for outcome in transport.write_batches(batches).await {
                if let Err(e) = outcome {
                    match &on_error {
                        Some(handler) => handler(&e),
                        None => warn!("InfluxDB write failed: {}", e),
                    }
                }
            }
        }))
    }

    /// Report every `interval` with the buffer gate applied, the first
    /// cycle one interval from now. Restarts an already running schedule.
    pub fn start(&self, interval: Duration) -> Result<(), Error> {
        if interval.is_zero() {
            return Err(ConfigError::Invalid("report interval must be positive".into()).into());
        }
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let mut schedule = self.inner.schedule.lock();
        if let Some(previous) = schedule.take() {
            previous.abort();
        }

        let reporter: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        *schedule = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = reporter.upgrade() else {
                    break;
                };
                Reporter { inner }.report(FlushMode::Buffered);
            }
        }));

        info!("InfluxDB reporter started (interval {:?})", interval);
        Ok(())
    }

    /// Cancel the schedule. No-op when not started.
    pub fn stop(&self) {
        if let Some(task) = self.inner.schedule.lock().take() {
            task.abort();
            info!("InfluxDB reporter stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .schedule
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// Builder for [`Reporter`], carrying the non-serialisable hooks.
pub struct ReporterBuilder {
    config: ReporterConfig,
    tagger: Option<crate::mapping::Tagger>,
    namer: Option<crate::mapping::Namer>,
    field_filter: Option<crate::mapping::FieldFilter>,
    on_metric_reported: Option<MetricReportedHook>,
    on_transport_error: Option<TransportErrorHandler>,
}

impl ReporterBuilder {
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            config,
            tagger: None,
            namer: None,
            field_filter: None,
            on_metric_reported: None,
            on_transport_error: None,
        }
    }

    /// Per-metric tags derived from the metric key.
    pub fn tagger<F>(mut self, tagger: F) -> Self
    where
        F: Fn(&str) -> TagSet + Send + Sync + 'static,
    {
        self.tagger = Some(Arc::new(tagger));
        self
    }

    /// Measurement name from the metric key and its resolved tags.
    pub fn namer<F>(mut self, namer: F) -> Self
    where
        F: Fn(&str, &TagSet) -> String + Send + Sync + 'static,
    {
        self.namer = Some(Arc::new(namer));
        self
    }

    /// Predicate `(key, snapshot, field name, value)` deciding which
    /// fields are written.
    pub fn field_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &MetricSnapshot, &str, &FieldValue) -> bool + Send + Sync + 'static,
    {
        self.field_filter = Some(Arc::new(filter));
        self
    }

    /// Hook fired once per metric after its points are queued, even when
    /// filtering left nothing to write. Idle metrics do not fire it.
    pub fn on_metric_reported<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &dyn Metric) + Send + Sync + 'static,
    {
        self.on_metric_reported = Some(Arc::new(hook));
        self
    }

    pub fn on_transport_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.on_transport_error = Some(Arc::new(handler));
        self
    }

    /// Build with the transport selected by the configured protocol.
    pub fn build(self) -> Result<Reporter<Client>, Error> {
        let client = Client::from_config(&self.config)?;
        self.build_with_transport(client)
    }

    /// Build around a caller-supplied transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Reporter<T>, Error> {
        self.config.validate()?;

        let mut translator = MetricTranslator::new(
            self.config.tags.clone(),
            self.config.skip_idle_metrics,
            self.config.precision(),
        );
        if let Some(tagger) = self.tagger {
            translator = translator.with_tagger(tagger);
        }
        if let Some(namer) = self.namer {
            translator = translator.with_namer(namer);
        }
        if let Some(filter) = self.field_filter {
            translator = translator.with_field_filter(filter);
        }

        let schedule_interval = self.config.schedule_interval();
        let reporter = Reporter {
            inner: Arc::new(Inner {
                config: self.config,
                translator,
                transport: Arc::new(transport),
                metrics: RwLock::new(Vec::new()),
                pending: Mutex::new(PendingPoints::new()),
                previous: Mutex::new(PreviousValues::new()),
                reporting: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                on_metric_reported: self.on_metric_reported,
                on_transport_error: self.on_transport_error,
                schedule: Mutex::new(None),
            }),
        };

        if let Some(interval) = schedule_interval {
            reporter.start(interval)?;
        }
        Ok(reporter)
    }
}
