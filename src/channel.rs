//! Battery channels and the per-deployment registry of which are fitted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One physically distinct battery reporting its own state of charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BatteryChannel {
    #[serde(rename = "front_base_batt_1_soc")]
    Front1,
    #[serde(rename = "front_base_batt_2_soc")]
    Front2,
    #[serde(rename = "rear_base_batt_1_soc")]
    Rear1,
    #[serde(rename = "rear_base_batt_2_soc")]
    Rear2,
    #[serde(rename = "aux_batt_soc")]
    Aux,
}

impl BatteryChannel {
    /// Every recognized channel, in platform order.
    pub const ALL: [BatteryChannel; 5] = [
        BatteryChannel::Front1,
        BatteryChannel::Front2,
        BatteryChannel::Rear1,
        BatteryChannel::Rear2,
        BatteryChannel::Aux,
    ];

    /// The sensor item name this channel reports under.
    pub fn item_name(&self) -> &'static str {
        match self {
            BatteryChannel::Front1 => "front_base_batt_1_soc",
            BatteryChannel::Front2 => "front_base_batt_2_soc",
            BatteryChannel::Rear1 => "rear_base_batt_1_soc",
            BatteryChannel::Rear2 => "rear_base_batt_2_soc",
            BatteryChannel::Aux => "aux_batt_soc",
        }
    }

    /// Look up a channel by its sensor item name.
    ///
    /// Returns `None` for anything that is not a battery SoC item.
    pub fn from_item_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.item_name() == name)
    }

    /// Human-readable label used in spoken and logged warnings.
    pub fn label(&self) -> &'static str {
        match self {
            BatteryChannel::Front1 => "Front battery one",
            BatteryChannel::Front2 => "Front battery two",
            BatteryChannel::Rear1 => "Rear battery one",
            BatteryChannel::Rear2 => "Rear battery two",
            BatteryChannel::Aux => "Auxiliary battery",
        }
    }
}

impl fmt::Display for BatteryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.item_name())
    }
}

/// Which battery channels are fitted on this platform.
///
/// Built once at startup from configuration and never mutated. A flag
/// missing from the configuration means the battery is not fitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRegistry {
    pub front_base_batt_1: bool,
    pub front_base_batt_2: bool,
    pub rear_base_batt_1: bool,
    pub rear_base_batt_2: bool,
    pub aux_batt: bool,
}

impl ChannelRegistry {
    /// A registry with every channel enabled.
    pub fn all() -> Self {
        Self {
            front_base_batt_1: true,
            front_base_batt_2: true,
            rear_base_batt_1: true,
            rear_base_batt_2: true,
            aux_batt: true,
        }
    }

    /// A registry with only the given channels enabled.
    pub fn with_channels<I>(channels: I) -> Self
    where
        I: IntoIterator<Item = BatteryChannel>,
    {
        let mut registry = Self::default();
        for channel in channels {
            *registry.flag_mut(channel) = true;
        }
        registry
    }

    pub fn is_enabled(&self, channel: BatteryChannel) -> bool {
        match channel {
            BatteryChannel::Front1 => self.front_base_batt_1,
            BatteryChannel::Front2 => self.front_base_batt_2,
            BatteryChannel::Rear1 => self.rear_base_batt_1,
            BatteryChannel::Rear2 => self.rear_base_batt_2,
            BatteryChannel::Aux => self.aux_batt,
        }
    }

    /// Enabled channels in platform order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = BatteryChannel> + '_ {
        BatteryChannel::ALL
            .into_iter()
            .filter(move |c| self.is_enabled(*c))
    }

    fn flag_mut(&mut self, channel: BatteryChannel) -> &mut bool {
        match channel {
            BatteryChannel::Front1 => &mut self.front_base_batt_1,
            BatteryChannel::Front2 => &mut self.front_base_batt_2,
            BatteryChannel::Rear1 => &mut self.rear_base_batt_1,
            BatteryChannel::Rear2 => &mut self.rear_base_batt_2,
            BatteryChannel::Aux => &mut self.aux_batt,
        }
    }
}
