//! Battery status extraction and alert decisions.
//!
//! ## Submodules
//!
//! - [`status`]: Filters raw readings to fitted batteries ([`StatusRecord`])
//! - [`alert`]: Severity tiers and cooldown suppression ([`SuppressionEngine`])
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "5m", "900s")
//!
//! ## Data Flow
//!
//! ```text
//! RawReading (sensor items)
//!        │
//!        ▼
//! StatusRecord::extract()  ◀── ChannelRegistry
//!        │
//!        ├──▶ published to outputs
//!        │
//!        └──▶ SuppressionEngine::evaluate() ──▶ FiredWarning ──▶ NotificationSink
//! ```

pub mod alert;
pub mod duration;
pub mod status;

pub use alert::{CooldownMode, Cooldowns, FiredWarning, Severity, SuppressionEngine};
pub use status::{BatteryStatus, StatusRecord};
