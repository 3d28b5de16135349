//! Stream-based reading source.
//!
//! Receives readings from an async byte stream. This covers TCP
//! connections, stdin and raw message bus payloads.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{RawReading, ReadingSource};

/// A reading source that decodes newline-delimited JSON from a stream.
///
/// A background task reads lines from the provided reader. Lines that do
/// not parse as a reading are skipped and recorded as the last error.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use rmp_battmon::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = br#"{"sensor_items":["aux_batt_soc"],"sensor_values":[55.0]}"#;
/// let stream = Cursor::new([&data[..], b"\n"].concat());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<RawReading>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();
        let desc = description.to_string();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("{}: end of stream", desc);
                        *error_handle.lock() = Some("Connection closed".to_string());
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<RawReading>(trimmed) {
                            Ok(reading) => {
                                *error_handle.lock() = None;
                                if tx.send(reading).await.is_err() {
                                    // Receiver dropped
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("{}: skipping unparseable reading: {}", desc, e);
                                *error_handle.lock() = Some(format!("Parse error: {}", e));
                            }
                        }
                    }
                    Err(e) => {
                        warn!("{}: read failed: {}", desc, e);
                        *error_handle.lock() = Some(format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            last_error,
        }
    }

    /// Create a StreamSource from a channel of raw JSON payloads.
    ///
    /// Each payload is one complete reading, as delivered by a message bus
    /// client that already handles framing.
    pub fn from_bytes_channel(mut rx: mpsc::Receiver<Vec<u8>>, description: &str) -> Self {
        let (tx, reading_rx) = mpsc::channel(16);
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                match serde_json::from_slice::<RawReading>(&bytes) {
                    Ok(reading) => {
                        *error_handle.lock() = None;
                        if tx.send(reading).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        *error_handle.lock() = Some(format!("Parse error: {}", e));
                    }
                }
            }
        });

        Self {
            receiver: reading_rx,
            description: format!("stream: {}", description),
            last_error,
        }
    }
}

impl ReadingSource for StreamSource {
    async fn recv(&mut self) -> Option<RawReading> {
        let reading = self.receiver.recv().await;
        if reading.is_none() {
            let mut error = self.last_error.lock();
            if error.is_none() {
                *error = Some("Stream disconnected".to_string());
            }
        }
        reading
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}
