//! Status extraction.
//!
//! Turns a raw sensor reading into the canonical battery status record
//! that is published and fed to the alert engine.

use serde::{Deserialize, Serialize};

use crate::channel::{BatteryChannel, ChannelRegistry};
use crate::source::RawReading;
use crate::time::Timestamp;

/// State of charge reported for one battery channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub channel: BatteryChannel,
    /// State of charge in percent.
    pub soc: f64,
}

/// Battery status derived from the most recent reading.
///
/// Contains only channels that are fitted on this platform and were
/// present in the reading, in the order the reading listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub timestamp_ms: Timestamp,
    pub batteries: Vec<BatteryStatus>,
}

impl StatusRecord {
    /// Filter `reading` down to the enabled battery channels.
    ///
    /// Unknown item names and channels that are not fitted are dropped
    /// silently. This never fails; a reading with nothing relevant in it
    /// yields an empty record.
    pub fn extract(reading: &RawReading, registry: &ChannelRegistry, now: Timestamp) -> Self {
        let batteries = reading
            .items()
            .iter()
            .filter_map(|item| {
                let channel = BatteryChannel::from_item_name(&item.name)?;
                registry.is_enabled(channel).then_some(BatteryStatus {
                    channel,
                    soc: item.value,
                })
            })
            .collect();

        Self {
            timestamp_ms: now,
            batteries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batteries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.batteries.len()
    }

    /// State of charge for `channel`, if it was reported.
    ///
    /// When a reading repeats a channel the first entry wins.
    pub fn soc(&self, channel: BatteryChannel) -> Option<f64> {
        self.batteries
            .iter()
            .find(|b| b.channel == channel)
            .map(|b| b.soc)
    }

    pub fn channels(&self) -> impl Iterator<Item = BatteryChannel> + '_ {
        self.batteries.iter().map(|b| b.channel)
    }
}
