//! Rendering of low-charge warnings to the operator.
//!
//! The monitor only knows the [`NotificationSink`] trait. How a warning
//! reaches a person (speech, a log line, another process) is up to the
//! sink. Sinks must return quickly; anything slow belongs in a background
//! task owned by the sink.

use std::fmt::Debug;
use std::process::ExitStatus;
use std::sync::OnceLock;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::data::Severity;
use crate::error::NotifyError;

/// Something that can tell an operator a battery is running low.
pub trait NotificationSink: Send + Sync + Debug {
    /// Announce that the battery called `label` is at `soc` percent.
    fn notify(&self, label: &str, soc: f64) -> Result<(), NotifyError>;
}

/// The sentence spoken or logged for a warning.
///
/// The announced figure is the boundary of the tier the charge fell
/// into, e.g. "Front battery one has 5 percent remaining" for anything
/// under 5%.
pub fn warning_phrase(label: &str, soc: f64) -> String {
    match Severity::classify(soc).threshold() {
        Some(percent) => format!("{} has {} percent remaining", label, percent),
        None => format!("{} has {:.0} percent remaining", label, soc),
    }
}

/// Writes warnings to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, label: &str, soc: f64) -> Result<(), NotifyError> {
        warn!("{} (at {:.1}%)", warning_phrase(label, soc), soc);
        Ok(())
    }
}

/// Speaks warnings through an external text-to-speech command.
///
/// The command is run with the phrase as its last argument. Phrases are
/// queued to a single background task that waits for each command to
/// finish before starting the next, so simultaneous warnings are spoken
/// one after the other. `notify` itself never waits.
#[derive(Debug, Clone)]
pub struct SpeechSink {
    program: String,
    args: Vec<String>,
    queue: OnceLock<mpsc::UnboundedSender<String>>,
}

impl SpeechSink {
    pub const DEFAULT_PROGRAM: &'static str = "espeak";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            queue: OnceLock::new(),
        }
    }

    /// Extra arguments placed before the phrase (voice, speed, ...).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The phrase queue, starting its worker on first use.
    fn queue(&self) -> Result<&mpsc::UnboundedSender<String>, NotifyError> {
        if let Some(queue) = self.queue.get() {
            return Ok(queue);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| NotifyError::NoRuntime(self.program.clone()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(speak_queued(self.program.clone(), self.args.clone(), rx));
        Ok(self.queue.get_or_init(|| tx))
    }
}

impl Default for SpeechSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl NotificationSink for SpeechSink {
    fn notify(&self, label: &str, soc: f64) -> Result<(), NotifyError> {
        self.queue()?
            .send(warning_phrase(label, soc))
            .map_err(|_| NotifyError::Closed)
    }
}

/// Speak queued phrases in order until every sender is gone.
async fn speak_queued(program: String, args: Vec<String>, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(phrase) = rx.recv().await {
        match speak(&program, &args, &phrase).await {
            Ok(status) if status.success() => debug!("{}: said \"{}\"", program, phrase),
            Ok(status) => warn!("{} exited with {}", program, status),
            Err(e) => warn!("{}", e),
        }
    }
    debug!("{} speech queue closed", program);
}

/// Run the speech command once and wait for it to finish.
async fn speak(program: &str, args: &[String], phrase: &str) -> Result<ExitStatus, NotifyError> {
    Command::new(program)
        .args(args)
        .arg(phrase)
        .status()
        .await
        .map_err(|source| NotifyError::Spawn {
            command: program.to_string(),
            source,
        })
}

/// A warning as delivered by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub label: String,
    pub soc: f64,
}

/// Forwards warnings through an unbounded channel.
///
/// Lets another part of the process (a UI, a bus publisher, a test)
/// decide how to render them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiver its warnings arrive on.
    pub fn create() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, rx) = mpsc::unbounded_channel();
        (Self { sender }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, label: &str, soc: f64) -> Result<(), NotifyError> {
        self.sender
            .send(Notification {
                label: label.to_string(),
                soc,
            })
            .map_err(|_| NotifyError::Closed)
    }
}
