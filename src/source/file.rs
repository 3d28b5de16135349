//! File-based reading source.
//!
//! Watches a JSON file holding the latest feedback message.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

use super::{RawReading, ReadingSource};

/// A reading source that re-reads a JSON file whenever it changes.
///
/// The source tracks the file's modification time and only yields a new
/// reading when the file has been updated. Between checks it sleeps for
/// the configured interval, so the feed never ends on its own.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    interval: Duration,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    /// Create a new file source for the given path, checking once a second.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            interval: Duration::from_secs(1),
            last_error: None,
            last_modified: None,
        }
    }

    /// Change how often the file is checked for updates.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the file once, returning a reading if it changed.
    ///
    /// This never blocks.
    pub fn poll(&mut self) -> Option<RawReading> {
        let current_modified = self.get_modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, always read
            (Some(_), None) => false, // File disappeared, keep waiting
            (Some(last), Some(current)) => current > last,
        };

        if file_changed {
            if let Some(reading) = self.read_file() {
                self.last_modified = current_modified;
                return Some(reading);
            }
        }

        None
    }

    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn read_file(&mut self) -> Option<RawReading> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(reading) => {
                    self.last_error = None;
                    Some(reading)
                }
                Err(e) => {
                    self.last_error = Some(format!("Parse error: {}", e));
                    None
                }
            },
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                None
            }
        }
    }
}

impl ReadingSource for FileSource {
    async fn recv(&mut self) -> Option<RawReading> {
        loop {
            if let Some(reading) = self.poll() {
                return Some(reading);
            }
            if let Some(err) = &self.last_error {
                debug!("{}: {}", self.description, err);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "sensor_items": ["front_base_batt_1_soc", "rear_base_batt_1_soc"],
            "sensor_values": [64.0, 12.5]
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/feedback.json");
        assert_eq!(source.path(), Path::new("/tmp/feedback.json"));
        assert_eq!(source.description(), "file: /tmp/feedback.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        let reading = source.poll().unwrap();
        assert_eq!(reading.len(), 2);

        // Unchanged file yields nothing
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_detects_changes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());
        let _ = source.poll();

        file.rewind().unwrap();
        file.as_file().set_len(0).unwrap();
        writeln!(
            file,
            r#"{{"sensor_items":["aux_batt_soc"],"sensor_values":[3.0]}}"#
        )
        .unwrap();
        file.flush().unwrap();

        // Push mtime forward explicitly so coarse filesystem clocks don't matter
        let later = SystemTime::now() + Duration::from_secs(5);
        file.as_file().set_modified(later).unwrap();

        let reading = source.poll().unwrap();
        assert_eq!(reading.items()[0].name, "aux_batt_soc");
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/feedback.json");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Parse error"));
    }

    #[tokio::test]
    async fn test_file_source_recv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path()).with_interval(Duration::from_millis(10));
        let reading = source.recv().await.unwrap();
        assert_eq!(reading.items()[1].value, 12.5);
    }
}
