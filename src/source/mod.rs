//! Inbound transport for raw sensor readings.
//!
//! This module provides a trait-based abstraction for receiving readings
//! from various feeds (in-process channels, network streams, files).
//! Readings are pushed to the monitor one at a time; the monitor awaits
//! the next reading only after the previous one has been fully handled.

mod channel;
mod file;
mod reading;
mod stream;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use reading::{FeedbackMessage, RawReading, SensorItem};
pub use stream::StreamSource;

use std::fmt::Debug;
use std::future::Future;

/// Trait for receiving raw readings from various feeds.
///
/// # Example
///
/// ```
/// use rmp_battmon::{ChannelSource, RawReading, ReadingSource};
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("bridge", 4);
/// tx.send(RawReading::new().with_item("aux_batt_soc", 71.0)).await.unwrap();
///
/// let reading = source.recv().await.unwrap();
/// assert_eq!(reading.len(), 1);
/// # });
/// ```
pub trait ReadingSource: Send + Debug {
    /// Wait for the next reading.
    ///
    /// Returns `None` once the feed has ended and no further readings
    /// will arrive.
    fn recv(&mut self) -> impl Future<Output = Option<RawReading>> + Send;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// The most recent error seen by the source, if any.
    fn error(&self) -> Option<String>;
}
