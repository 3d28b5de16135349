//! Output backends for publishing battery status.

use std::io;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::data::StatusRecord;

/// Destination for published status records.
///
/// Publication is best effort: nothing is retried and a slow or absent
/// consumer never holds up the monitor.
#[derive(Debug)]
pub enum StatusOutput {
    /// Write the latest record to a JSON file.
    ///
    /// The file is overwritten with each record.
    File(PathBuf),

    /// Send records to a TCP server.
    ///
    /// Each record is sent as a newline-delimited JSON message.
    Tcp(String),

    /// Send records through a channel.
    ///
    /// Use `StatusOutput::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<StatusRecord>),

    /// Print one JSON line per record on stdout.
    Stdout,
}

impl StatusOutput {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rmp_battmon::StatusOutput;
    ///
    /// let output = StatusOutput::file("battery_status.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StatusOutput::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        StatusOutput::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rmp_battmon::StatusOutput;
    ///
    /// let (output, mut rx) = StatusOutput::channel(16);
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StatusRecord>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (StatusOutput::Channel(tx), rx)
    }

    /// Publish a record to this output.
    pub async fn emit(&self, status: &StatusRecord) -> io::Result<()> {
        match self {
            StatusOutput::File(path) => {
                let json = serde_json::to_string_pretty(status)?;
                tokio::fs::write(path, json).await?;
            }
            StatusOutput::Tcp(addr) => {
                use tokio::net::TcpStream;

                let mut stream = TcpStream::connect(addr).await?;
                let mut json = serde_json::to_vec(status)?;
                json.push(b'\n');
                stream.write_all(&json).await?;
            }
            StatusOutput::Channel(tx) => match tx.try_send(status.clone()) {
                // Don't block if the consumer is behind
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "status receiver closed",
                    ));
                }
            },
            StatusOutput::Stdout => {
                let mut json = serde_json::to_vec(status)?;
                json.push(b'\n');
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&json).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            StatusOutput::File(path) => format!("file: {}", path.display()),
            StatusOutput::Tcp(addr) => format!("tcp: {}", addr),
            StatusOutput::Channel(_) => "channel".to_string(),
            StatusOutput::Stdout => "stdout".to_string(),
        }
    }
}
