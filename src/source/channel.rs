//! Channel-based reading source.
//!
//! Receives readings via a tokio mpsc channel. This is the bridge used
//! when readings come from a message bus client living elsewhere in the
//! process.

use tokio::sync::mpsc;

use super::{RawReading, ReadingSource};

/// A reading source fed through an in-process channel.
///
/// Every reading sent is delivered exactly once and in order. The feed
/// ends when all senders are dropped.
///
/// # Example
///
/// ```
/// use rmp_battmon::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("rmp_feedback", 16);
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawReading>,
    description: String,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// * `receiver` - The receiving end of an mpsc channel
    /// * `source_description` - Where readings come from (e.g. a topic name)
    pub fn new(receiver: mpsc::Receiver<RawReading>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
        }
    }

    /// Create a channel pair for sending readings to a ChannelSource.
    ///
    /// Returns (sender, source). `buffer` bounds the number of readings
    /// that may be queued ahead of the monitor.
    pub fn create(source_description: &str, buffer: usize) -> (mpsc::Sender<RawReading>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx, source_description))
    }
}

impl ReadingSource for ChannelSource {
    async fn recv(&mut self) -> Option<RawReading> {
        self.receiver.recv().await
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        None
    }
}
