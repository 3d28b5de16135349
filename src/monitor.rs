//! The battery monitor: one reading in, one status out, maybe a warning.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::ChannelRegistry;
use crate::data::{CooldownMode, Cooldowns, FiredWarning, StatusRecord, SuppressionEngine};
use crate::notify::{LogSink, NotificationSink};
use crate::output::StatusOutput;
use crate::source::{RawReading, ReadingSource};
use crate::time::{Clock, SystemClock};

/// Counters describing what the monitor has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    pub readings: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub warnings: u64,
    pub notify_failures: u64,
}

/// Watches battery readings, republishes their status and raises warnings.
///
/// Readings are handled strictly one at a time: extraction, publication,
/// evaluation and dispatch all finish before the next reading is looked
/// at. The suppression state lives inside the monitor and is only touched
/// through `&mut self`.
///
/// # Example
///
/// ```
/// use rmp_battmon::{BatteryChannel, BatteryMonitor, ChannelRegistry, ChannelSink, RawReading};
///
/// # tokio_test::block_on(async {
/// let (sink, mut warnings) = ChannelSink::create();
/// let mut monitor = BatteryMonitor::builder(ChannelRegistry::with_channels([BatteryChannel::Aux]))
///     .sink(sink)
///     .build();
///
/// let reading = RawReading::new().with_item("aux_batt_soc", 80.0);
/// monitor.handle_reading(&reading).await;
/// assert!(warnings.try_recv().is_err());
/// # });
/// ```
#[derive(Debug)]
pub struct BatteryMonitor {
    registry: ChannelRegistry,
    engine: SuppressionEngine,
    clock: Arc<dyn Clock>,
    outputs: Vec<StatusOutput>,
    sink: Box<dyn NotificationSink>,
    publish_timeout: Duration,
    last_status: Option<StatusRecord>,
    stats: MonitorStats,
}

impl BatteryMonitor {
    /// Create a builder for configuring the monitor.
    pub fn builder(registry: ChannelRegistry) -> BatteryMonitorBuilder {
        BatteryMonitorBuilder::new(registry)
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &SuppressionEngine {
        &self.engine
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// The status produced from the most recent reading.
    pub fn last_status(&self) -> Option<&StatusRecord> {
        self.last_status.as_ref()
    }

    /// Process one reading to completion.
    ///
    /// Returns the warnings that fired. Output and sink failures are
    /// logged and counted, never returned.
    pub async fn handle_reading(&mut self, reading: &RawReading) -> Vec<FiredWarning> {
        let now = self.clock.now();
        self.stats.readings += 1;

        let status = StatusRecord::extract(reading, &self.registry, now);
        debug!(
            "reading with {} items -> {} batteries",
            reading.len(),
            status.len()
        );

        self.publish(&status).await;

        let fired = self.engine.evaluate(&status, now);
        for warning in &fired {
            self.stats.warnings += 1;
            info!(
                "{} {} at {}%",
                warning.severity.symbol(),
                warning.label(),
                warning.soc
            );
            if let Err(e) = self.sink.notify(warning.label(), warning.soc) {
                self.stats.notify_failures += 1;
                warn!("could not deliver warning for {}: {}", warning.channel, e);
            }
        }

        self.last_status = Some(status);
        fired
    }

    /// Consume readings from `source` until it ends.
    pub async fn run<S: ReadingSource>(&mut self, source: &mut S) -> MonitorStats {
        info!("reading battery state from {}", source.description());

        while let Some(reading) = source.recv().await {
            self.handle_reading(&reading).await;
        }

        match source.error() {
            Some(e) => warn!("{} ended: {}", source.description(), e),
            None => info!("{} ended", source.description()),
        }
        self.stats
    }

    async fn publish(&mut self, status: &StatusRecord) {
        for output in &self.outputs {
            match tokio::time::timeout(self.publish_timeout, output.emit(status)).await {
                Ok(Ok(())) => self.stats.published += 1,
                Ok(Err(e)) => {
                    self.stats.publish_failures += 1;
                    warn!("publish to {} failed: {}", output.describe(), e);
                }
                Err(_) => {
                    self.stats.publish_failures += 1;
                    warn!("publish to {} timed out", output.describe());
                }
            }
        }
    }
}

/// Builder for [`BatteryMonitor`].
#[derive(Debug)]
pub struct BatteryMonitorBuilder {
    registry: ChannelRegistry,
    clock: Arc<dyn Clock>,
    cooldowns: Cooldowns,
    mode: CooldownMode,
    outputs: Vec<StatusOutput>,
    sink: Box<dyn NotificationSink>,
    publish_timeout: Duration,
}

impl BatteryMonitorBuilder {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            cooldowns: Cooldowns::default(),
            mode: CooldownMode::default(),
            outputs: Vec::new(),
            sink: Box::new(LogSink),
            publish_timeout: Duration::from_secs(1),
        }
    }

    /// Use `clock` for every timestamp (default: system time).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cooldowns(mut self, cooldowns: Cooldowns) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn mode(mut self, mode: CooldownMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a destination for published status. May be called repeatedly.
    pub fn output(mut self, output: StatusOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Render warnings with `sink` (default: [`LogSink`]).
    pub fn sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Same as [`sink`](Self::sink) for an already boxed sink.
    pub fn boxed_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Upper bound on how long one output may take to accept a record.
    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Build the monitor. The suppression deadline starts at the clock's
    /// current time.
    pub fn build(self) -> BatteryMonitor {
        let engine = SuppressionEngine::with_config(self.clock.now(), self.cooldowns, self.mode);
        BatteryMonitor {
            registry: self.registry,
            engine,
            clock: self.clock,
            outputs: self.outputs,
            sink: self.sink,
            publish_timeout: self.publish_timeout,
            last_status: None,
            stats: MonitorStats::default(),
        }
    }
}
