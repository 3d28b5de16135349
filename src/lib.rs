//! # rmp-battmon
//!
//! Battery state-of-charge monitor for mobile robot bases.
//!
//! The monitor listens to the base's sensor feedback, keeps only the
//! battery channels that are actually fitted, republishes them as a
//! normalized status record and warns the operator when a battery runs
//! low. Warnings are rate limited with a cooldown so a draining battery
//! does not produce a warning on every update.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          BatteryMonitor                          │
//! │                                                                  │
//! │  ┌─────────┐   ┌────────────────┐   ┌──────────────────┐         │
//! │  │ source  │──▶│ StatusRecord:: │──▶│ SuppressionEngine│──┐      │
//! │  │ (input) │   │   extract()    │   │   evaluate()     │  │      │
//! │  └─────────┘   └───────┬────────┘   └──────────────────┘  │      │
//! │       ▲                │                                  ▼      │
//! │       │                ▼                         ┌─────────────┐ │
//! │  Channel | Stream | File    StatusOutput         │ Notification│ │
//! │                        (file, tcp, stdout, chan) │    Sink     │ │
//! │                                                  └─────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`channel`]**: the five battery channels and the [`ChannelRegistry`]
//!   of which are fitted
//! - **[`source`]**: the [`ReadingSource`] trait with channel, stream and
//!   file implementations
//! - **[`data`]**: status extraction and the tiered [`SuppressionEngine`]
//! - **[`output`]**: where status records are published
//! - **[`notify`]**: the [`NotificationSink`] trait with log, speech and
//!   channel sinks
//! - **[`monitor`]**: [`BatteryMonitor`], which runs the whole pipeline
//!
//! ## Severity tiers
//!
//! | state of charge | severity | cooldown |
//! |---|---|---|
//! | below 5% | critical | 5 minutes |
//! | below 10% | high | 10 minutes |
//! | below 20% | moderate | 15 minutes |
//! | 20% and above | none | 20 minutes |
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Read newline-delimited feedback JSON from a TCP bridge, speak warnings
//! rmp-battmon --config battmon.toml --connect robot:9090 --stdout
//! ```
//!
//! ### As a library
//!
//! ```
//! use rmp_battmon::{BatteryChannel, BatteryMonitor, ChannelRegistry, ChannelSource, StatusOutput};
//!
//! # tokio_test::block_on(async {
//! let registry = ChannelRegistry::with_channels([BatteryChannel::Front1, BatteryChannel::Rear1]);
//! let (output, mut published) = StatusOutput::channel(16);
//! let mut monitor = BatteryMonitor::builder(registry).output(output).build();
//!
//! let (tx, mut source) = ChannelSource::create("rmp_feedback", 16);
//! drop(tx);
//! monitor.run(&mut source).await;
//! # });
//! ```

pub mod channel;
pub mod data;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod settings;
pub mod source;
pub mod time;

// Re-export main types for convenience
pub use channel::{BatteryChannel, ChannelRegistry};
pub use data::{
    BatteryStatus, CooldownMode, Cooldowns, FiredWarning, Severity, StatusRecord, SuppressionEngine,
};
pub use error::{ConfigError, NotifyError};
pub use monitor::{BatteryMonitor, BatteryMonitorBuilder, MonitorStats};
pub use notify::{ChannelSink, LogSink, Notification, NotificationSink, SpeechSink};
pub use output::StatusOutput;
pub use settings::Settings;
pub use source::{ChannelSource, FileSource, RawReading, ReadingSource, StreamSource};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
