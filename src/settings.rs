//! Settings, read once at startup.
//!
//! Settings come from an optional file (any format the `config` crate
//! understands, usually TOML) overlaid with `BATTMON_*` environment
//! variables. Nested keys use a double underscore:
//!
//! ```toml
//! [batteries]
//! front_base_batt_1 = true
//! aux_batt = true
//!
//! [alerts]
//! mode = "global"          # or "per-channel"
//!
//! [alerts.cooldowns]
//! critical = "5m"
//! high = "10m"
//! moderate = "15m"
//! normal = "20m"
//!
//! [notify]
//! sink = "speech"          # or "log"
//! command = "espeak"
//! ```
//!
//! ```bash
//! BATTMON_BATTERIES__REAR_BASE_BATT_1=true rmp-battmon --config battmon.toml
//! ```

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::channel::ChannelRegistry;
use crate::data::{CooldownMode, Cooldowns};
use crate::error::ConfigError;
use crate::notify::{LogSink, NotificationSink, SpeechSink};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "BATTMON";

/// Everything the monitor reads at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which batteries are fitted.
    pub batteries: ChannelRegistry,
    pub alerts: AlertSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub mode: CooldownMode,
    pub cooldowns: Cooldowns,
}

/// Which notification sink renders warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Speak warnings through a text-to-speech command.
    #[default]
    Speech,
    /// Write warnings to the log only.
    Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub sink: SinkKind,
    /// Text-to-speech program used by the speech sink.
    pub command: String,
    /// Arguments passed to `command` before the phrase.
    pub args: Vec<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            command: SpeechSink::DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

impl NotifySettings {
    /// Build the configured sink.
    pub fn build_sink(&self) -> Box<dyn NotificationSink> {
        match self.sink {
            SinkKind::Speech => {
                Box::new(SpeechSink::new(&self.command).with_args(self.args.iter().cloned()))
            }
            SinkKind::Log => Box::new(LogSink),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`load`](Self::load) with a custom environment prefix.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.notify.sink == SinkKind::Speech && self.notify.command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "notify.command".to_string(),
                reason: "the speech sink needs a program to run".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::BatteryChannel;
    use std::io::Write;
    use std::time::Duration;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load_with_prefix(None, "BATTMON_TEST_DEFAULTS").unwrap();
        assert_eq!(settings.batteries.enabled_channels().count(), 0);
        assert_eq!(settings.alerts.mode, CooldownMode::Global);
        assert_eq!(settings.alerts.cooldowns, Cooldowns::default());
        assert_eq!(settings.notify.sink, SinkKind::Speech);
        assert_eq!(settings.notify.command, "espeak");
    }

    #[test]
    fn test_load_toml() {
        let file = toml_file(
            r#"
            [batteries]
            front_base_batt_1 = true
            aux_batt = true

            [alerts]
            mode = "per-channel"

            [alerts.cooldowns]
            critical = "2m"

            [notify]
            sink = "log"
            "#,
        );

        let settings = Settings::load_with_prefix(Some(file.path()), "BATTMON_TEST_TOML").unwrap();
        let enabled: Vec<_> = settings.batteries.enabled_channels().collect();
        assert_eq!(enabled, vec![BatteryChannel::Front1, BatteryChannel::Aux]);
        assert_eq!(settings.alerts.mode, CooldownMode::PerChannel);
        assert_eq!(settings.alerts.cooldowns.critical, Duration::from_secs(120));
        assert_eq!(settings.alerts.cooldowns.normal, Duration::from_secs(20 * 60));
        assert_eq!(settings.notify.sink, SinkKind::Log);
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("BATTMON_TEST_ENV_BATTERIES__REAR_BASE_BATT_2", "true");
        std::env::set_var("BATTMON_TEST_ENV_NOTIFY__SINK", "log");

        let settings = Settings::load_with_prefix(None, "BATTMON_TEST_ENV").unwrap();
        assert!(settings.batteries.is_enabled(BatteryChannel::Rear2));
        assert_eq!(settings.notify.sink, SinkKind::Log);

        std::env::remove_var("BATTMON_TEST_ENV_BATTERIES__REAR_BASE_BATT_2");
        std::env::remove_var("BATTMON_TEST_ENV_NOTIFY__SINK");
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let file = toml_file(
            r#"
            [alerts.cooldowns]
            critical = "whenever"
            "#,
        );
        let err = Settings::load_with_prefix(Some(file.path()), "BATTMON_TEST_BAD").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_empty_speech_command_is_rejected() {
        let file = toml_file(
            r#"
            [notify]
            command = ""
            "#,
        );
        let err = Settings::load_with_prefix(Some(file.path()), "BATTMON_TEST_CMD").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load_with_prefix(
            Some(Path::new("/nonexistent/battmon.toml")),
            "BATTMON_TEST_MISSING",
        );
        assert!(result.is_err());
    }
}
