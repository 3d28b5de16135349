//! Shared types for raw sensor readings.
//!
//! These types match the feedback message published by the platform base:
//! two parallel arrays, one of item names and one of item values.

use serde::{Deserialize, Serialize};

/// One named sensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorItem {
    pub name: String,
    pub value: f64,
}

/// A single atomic update of sensor values.
///
/// Item names are free-form; only a handful correspond to battery
/// state-of-charge channels. Order is preserved as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FeedbackMessage", into = "FeedbackMessage")]
pub struct RawReading {
    items: Vec<SensorItem>,
}

impl RawReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, keeping arrival order.
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.items.push(SensorItem {
            name: name.into(),
            value,
        });
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with_item(mut self, name: impl Into<String>, value: f64) -> Self {
        self.push(name, value);
        self
    }

    pub fn items(&self) -> &[SensorItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RawReading {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut reading = RawReading::new();
        for (name, value) in iter {
            reading.push(name, value);
        }
        reading
    }
}

/// Wire form of a reading: parallel name/value arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackMessage {
    /// Names of the reported items.
    #[serde(default)]
    pub sensor_items: Vec<String>,

    /// Values of the reported items, index-aligned with `sensor_items`.
    #[serde(default)]
    pub sensor_values: Vec<f64>,
}

impl From<FeedbackMessage> for RawReading {
    /// Pairs names with values positionally. Extra entries on the longer
    /// side have no partner and are dropped.
    fn from(msg: FeedbackMessage) -> Self {
        msg.sensor_items.into_iter().zip(msg.sensor_values).collect()
    }
}

impl From<RawReading> for FeedbackMessage {
    fn from(reading: RawReading) -> Self {
        let (sensor_items, sensor_values) = reading
            .items
            .into_iter()
            .map(|item| (item.name, item.value))
            .unzip();
        Self {
            sensor_items,
            sensor_values,
        }
    }
}
