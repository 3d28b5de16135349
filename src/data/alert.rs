//! Tiered low-charge warnings with cooldown-based suppression.
//!
//! Each battery in a status record is classified into a severity tier by
//! its state of charge. Firing (or clearing) a tier pushes the suppression
//! deadline forward by that tier's cooldown, and no warnings are raised
//! until the deadline has passed.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::duration::{self, format_duration};
use super::status::StatusRecord;
use crate::channel::BatteryChannel;
use crate::time::Timestamp;

/// SoC below which a battery is critical.
pub const CRITICAL_SOC: f64 = 5.0;
/// SoC below which a battery is high severity.
pub const HIGH_SOC: f64 = 10.0;
/// SoC below which a battery is moderate severity.
pub const MODERATE_SOC: f64 = 20.0;

/// How urgent a battery's state of charge is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Classify a state of charge, strictest tier first.
    ///
    /// NaN compares false against every threshold and lands in `Normal`.
    pub fn classify(soc: f64) -> Self {
        if soc < CRITICAL_SOC {
            Severity::Critical
        } else if soc < HIGH_SOC {
            Severity::High
        } else if soc < MODERATE_SOC {
            Severity::Moderate
        } else {
            Severity::Normal
        }
    }

    /// The percentage boundary of this tier, as announced to operators.
    pub fn threshold(&self) -> Option<u8> {
        match self {
            Severity::Critical => Some(CRITICAL_SOC as u8),
            Severity::High => Some(HIGH_SOC as u8),
            Severity::Moderate => Some(MODERATE_SOC as u8),
            Severity::Normal => None,
        }
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Normal => "OK",
            Severity::Moderate => "LOW",
            Severity::High => "HIGH",
            Severity::Critical => "CRIT",
        }
    }
}

/// How far each tier pushes the suppression deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cooldowns {
    #[serde(deserialize_with = "duration::deserialize", serialize_with = "serialize_duration")]
    pub critical: Duration,
    #[serde(deserialize_with = "duration::deserialize", serialize_with = "serialize_duration")]
    pub high: Duration,
    #[serde(deserialize_with = "duration::deserialize", serialize_with = "serialize_duration")]
    pub moderate: Duration,
    /// Applied when a battery is healthy, even though nothing fires.
    #[serde(deserialize_with = "duration::deserialize", serialize_with = "serialize_duration")]
    pub normal: Duration,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            critical: Duration::from_secs(5 * 60),
            high: Duration::from_secs(10 * 60),
            moderate: Duration::from_secs(15 * 60),
            normal: Duration::from_secs(20 * 60),
        }
    }
}

impl Cooldowns {
    pub fn for_severity(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Moderate => self.moderate,
            Severity::Normal => self.normal,
        }
    }
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}

/// How suppression deadlines are tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CooldownMode {
    /// One deadline shared by every channel. Within a pass the last
    /// channel evaluated decides the deadline.
    #[default]
    Global,
    /// Each channel has its own deadline, so a healthy battery can no
    /// longer hold back warnings for a failing one.
    PerChannel,
}

/// A low-charge warning raised for one battery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiredWarning {
    pub channel: BatteryChannel,
    pub soc: f64,
    pub severity: Severity,
}

impl FiredWarning {
    /// Human-readable battery label for the operator.
    pub fn label(&self) -> &'static str {
        self.channel.label()
    }
}

/// Decides which warnings fire and when the next may fire.
///
/// The engine owns its deadline state; callers hand it each status record
/// in turn together with the time it was taken.
#[derive(Debug, Clone)]
pub struct SuppressionEngine {
    cooldowns: Cooldowns,
    mode: CooldownMode,
    started: Timestamp,
    next_allowed: Timestamp,
    channel_deadlines: BTreeMap<BatteryChannel, Timestamp>,
}

impl SuppressionEngine {
    /// Create an engine whose deadline starts at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self::with_config(now, Cooldowns::default(), CooldownMode::default())
    }

    pub fn with_config(now: Timestamp, cooldowns: Cooldowns, mode: CooldownMode) -> Self {
        Self {
            cooldowns,
            mode,
            started: now,
            next_allowed: now,
            channel_deadlines: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> CooldownMode {
        self.mode
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    /// The suppression deadline.
    ///
    /// In per-channel mode this is the latest of the channel deadlines.
    pub fn next_allowed_time(&self) -> Timestamp {
        self.next_allowed
    }

    /// The deadline that currently applies to `channel`.
    pub fn deadline_for(&self, channel: BatteryChannel) -> Timestamp {
        match self.mode {
            CooldownMode::Global => self.next_allowed,
            CooldownMode::PerChannel => self
                .channel_deadlines
                .get(&channel)
                .copied()
                .unwrap_or(self.started),
        }
    }

    /// Evaluate a status record taken at `now`.
    ///
    /// Returns at most one warning per channel. A channel listed more than
    /// once in `status` is evaluated on its first entry only.
    pub fn evaluate(&mut self, status: &StatusRecord, now: Timestamp) -> Vec<FiredWarning> {
        match self.mode {
            CooldownMode::Global => self.evaluate_global(status, now),
            CooldownMode::PerChannel => self.evaluate_per_channel(status, now),
        }
    }

    fn evaluate_global(&mut self, status: &StatusRecord, now: Timestamp) -> Vec<FiredWarning> {
        if now <= self.next_allowed {
            debug!("warnings suppressed until {}", self.next_allowed);
            return Vec::new();
        }

        let mut seen = Vec::with_capacity(status.len());
        let mut fired = Vec::new();
        for battery in &status.batteries {
            if seen.contains(&battery.channel) {
                continue;
            }
            seen.push(battery.channel);

            let severity = Severity::classify(battery.soc);
            let cooldown = self.cooldowns.for_severity(severity);
            // Last writer wins: later channels overwrite earlier deadlines.
            self.next_allowed = now + cooldown;
            debug!(
                "{} at {}% is {:?}, next check in {}",
                battery.channel,
                battery.soc,
                severity,
                format_duration(cooldown)
            );

            if severity != Severity::Normal {
                fired.push(FiredWarning {
                    channel: battery.channel,
                    soc: battery.soc,
                    severity,
                });
            }
        }
        fired
    }

    fn evaluate_per_channel(&mut self, status: &StatusRecord, now: Timestamp) -> Vec<FiredWarning> {
        let mut fired = Vec::new();
        for battery in &status.batteries {
            let deadline = self.deadline_for(battery.channel);
            if now <= deadline {
                debug!("{} suppressed until {}", battery.channel, deadline);
                continue;
            }

            let severity = Severity::classify(battery.soc);
            let next = now + self.cooldowns.for_severity(severity);
            self.channel_deadlines.insert(battery.channel, next);
            self.next_allowed = self.next_allowed.max(next);

            if severity != Severity::Normal {
                fired.push(FiredWarning {
                    channel: battery.channel,
                    soc: battery.soc,
                    severity,
                });
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::status::BatteryStatus;

    const MINUTE: Duration = Duration::from_secs(60);

    fn t0() -> Timestamp {
        Timestamp::from_millis(1_700_000_000_000)
    }

    fn status(at: Timestamp, batteries: &[(BatteryChannel, f64)]) -> StatusRecord {
        StatusRecord {
            timestamp_ms: at,
            batteries: batteries
                .iter()
                .map(|&(channel, soc)| BatteryStatus { channel, soc })
                .collect(),
        }
    }

    #[test]
    fn test_classify_tiers() {
        assert_eq!(Severity::classify(0.0), Severity::Critical);
        assert_eq!(Severity::classify(4.99), Severity::Critical);
        assert_eq!(Severity::classify(5.0), Severity::High);
        assert_eq!(Severity::classify(9.9), Severity::High);
        assert_eq!(Severity::classify(10.0), Severity::Moderate);
        assert_eq!(Severity::classify(19.9), Severity::Moderate);
        assert_eq!(Severity::classify(20.0), Severity::Normal);
        assert_eq!(Severity::classify(100.0), Severity::Normal);
        assert_eq!(Severity::classify(-3.0), Severity::Critical);
        assert_eq!(Severity::classify(f64::NAN), Severity::Normal);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Normal);
    }

    #[test]
    fn test_default_cooldowns() {
        let c = Cooldowns::default();
        assert_eq!(c.for_severity(Severity::Critical), 5 * MINUTE);
        assert_eq!(c.for_severity(Severity::High), 10 * MINUTE);
        assert_eq!(c.for_severity(Severity::Moderate), 15 * MINUTE);
        assert_eq!(c.for_severity(Severity::Normal), 20 * MINUTE);
    }

    #[test]
    fn test_cooldowns_from_config_strings() {
        let json = r#"{ "critical": "1m", "normal": "30m" }"#;
        let c: Cooldowns = serde_json::from_str(json).unwrap();
        assert_eq!(c.critical, MINUTE);
        assert_eq!(c.high, 10 * MINUTE);
        assert_eq!(c.normal, 30 * MINUTE);
    }

    #[test]
    fn test_evaluation_at_construction_time_is_suppressed() {
        let mut engine = SuppressionEngine::new(t0());
        let s = status(t0(), &[(BatteryChannel::Front1, 1.0)]);
        assert!(engine.evaluate(&s, t0()).is_empty());
    }

    #[test]
    fn test_healthy_battery_sets_normal_cooldown() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);
        let s = status(now, &[(BatteryChannel::Front1, 45.0)]);

        assert!(engine.evaluate(&s, now).is_empty());
        assert_eq!(engine.next_allowed_time(), now + 20 * MINUTE);
    }

    #[test]
    fn test_critical_fires() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);
        let s = status(now, &[(BatteryChannel::Front1, 3.0)]);

        let fired = engine.evaluate(&s, now);
        assert_eq!(
            fired,
            vec![FiredWarning {
                channel: BatteryChannel::Front1,
                soc: 3.0,
                severity: Severity::Critical,
            }]
        );
        assert_eq!(fired[0].label(), "Front battery one");
        assert_eq!(engine.next_allowed_time(), now + 5 * MINUTE);
    }

    #[test]
    fn test_repeat_within_cooldown_is_suppressed() {
        let mut engine = SuppressionEngine::new(t0());
        let first = t0() + Duration::from_secs(1);
        let s = status(first, &[(BatteryChannel::Front1, 3.0)]);
        assert_eq!(engine.evaluate(&s, first).len(), 1);

        let second = first + 2 * MINUTE;
        assert!(engine.evaluate(&s, second).is_empty());

        // Exactly at the deadline is still suppressed
        let deadline = engine.next_allowed_time();
        assert!(engine.evaluate(&s, deadline).is_empty());

        // Just past it fires again
        let after = deadline + Duration::from_millis(1);
        assert_eq!(engine.evaluate(&s, after).len(), 1);
    }

    #[test]
    fn test_suppressed_calls_do_not_move_deadline() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);
        engine.evaluate(&status(now, &[(BatteryChannel::Rear1, 12.0)]), now);
        let deadline = engine.next_allowed_time();

        for minutes in [1, 5, 14] {
            let at = now + minutes * MINUTE;
            let s = status(at, &[(BatteryChannel::Rear1, 0.5)]);
            assert!(engine.evaluate(&s, at).is_empty());
            assert_eq!(engine.next_allowed_time(), deadline);
        }
    }

    #[test]
    fn test_one_warning_per_channel_with_matching_tier() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);
        let s = status(
            now,
            &[
                (BatteryChannel::Front1, 2.0),
                (BatteryChannel::Front2, 7.0),
                (BatteryChannel::Rear1, 15.0),
                (BatteryChannel::Rear2, 80.0),
            ],
        );

        let fired = engine.evaluate(&s, now);
        let tiers: Vec<_> = fired.iter().map(|w| (w.channel, w.severity)).collect();
        assert_eq!(
            tiers,
            vec![
                (BatteryChannel::Front1, Severity::Critical),
                (BatteryChannel::Front2, Severity::High),
                (BatteryChannel::Rear1, Severity::Moderate),
            ]
        );
    }

    #[test]
    fn test_global_mode_last_channel_wins() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);

        // Critical first, healthy last: the healthy battery's 20 minutes stick
        let s = status(now, &[(BatteryChannel::Front1, 2.0), (BatteryChannel::Aux, 90.0)]);
        engine.evaluate(&s, now);
        assert_eq!(engine.next_allowed_time(), now + 20 * MINUTE);

        // Reversed order: the critical battery's 5 minutes stick
        let mut engine = SuppressionEngine::new(t0());
        let s = status(now, &[(BatteryChannel::Aux, 90.0), (BatteryChannel::Front1, 2.0)]);
        engine.evaluate(&s, now);
        assert_eq!(engine.next_allowed_time(), now + 5 * MINUTE);
    }

    #[test]
    fn test_duplicate_channel_evaluated_once() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + Duration::from_secs(1);
        let s = status(now, &[(BatteryChannel::Aux, 4.0), (BatteryChannel::Aux, 50.0)]);

        let fired = engine.evaluate(&s, now);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].soc, 4.0);
        assert_eq!(engine.next_allowed_time(), now + 5 * MINUTE);
    }

    #[test]
    fn test_deadline_is_monotonic() {
        let mut engine = SuppressionEngine::new(t0());
        let socs = [3.0, 50.0, 8.0, 18.0, 1.0, 99.0, 6.0];
        let mut now = t0();
        let mut previous = engine.next_allowed_time();

        for (i, soc) in socs.iter().cycle().take(40).enumerate() {
            now = now + Duration::from_secs(97 * (i as u64 % 7 + 1));
            let s = status(now, &[(BatteryChannel::Rear2, *soc), (BatteryChannel::Front2, 30.0 - soc)]);
            engine.evaluate(&s, now);
            assert!(engine.next_allowed_time() >= previous);
            previous = engine.next_allowed_time();
        }
    }

    #[test]
    fn test_empty_status_leaves_deadline() {
        let mut engine = SuppressionEngine::new(t0());
        let now = t0() + MINUTE;
        assert!(engine.evaluate(&StatusRecord::default(), now).is_empty());
        assert_eq!(engine.next_allowed_time(), t0());
    }

    #[test]
    fn test_per_channel_mode_tracks_channels_separately() {
        let mut engine =
            SuppressionEngine::with_config(t0(), Cooldowns::default(), CooldownMode::PerChannel);
        let now = t0() + Duration::from_secs(1);

        let s = status(now, &[(BatteryChannel::Front1, 3.0), (BatteryChannel::Aux, 90.0)]);
        assert_eq!(engine.evaluate(&s, now).len(), 1);
        assert_eq!(engine.deadline_for(BatteryChannel::Front1), now + 5 * MINUTE);
        assert_eq!(engine.deadline_for(BatteryChannel::Aux), now + 20 * MINUTE);
        assert_eq!(engine.next_allowed_time(), now + 20 * MINUTE);

        // Six minutes later the front battery is eligible again even though
        // the auxiliary battery is still cooling down.
        let later = now + 6 * MINUTE;
        let s = status(later, &[(BatteryChannel::Front1, 3.0), (BatteryChannel::Aux, 2.0)]);
        let fired = engine.evaluate(&s, later);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].channel, BatteryChannel::Front1);
    }

    #[test]
    fn test_per_channel_unseen_channel_uses_start_time() {
        let mut engine =
            SuppressionEngine::with_config(t0(), Cooldowns::default(), CooldownMode::PerChannel);
        assert_eq!(engine.deadline_for(BatteryChannel::Rear2), t0());

        let s = status(t0(), &[(BatteryChannel::Rear2, 1.0)]);
        assert!(engine.evaluate(&s, t0()).is_empty());
    }

    #[test]
    fn test_per_channel_duplicate_channel_evaluated_once() {
        let mut engine =
            SuppressionEngine::with_config(t0(), Cooldowns::default(), CooldownMode::PerChannel);
        let now = t0() + Duration::from_secs(1);
        let s = status(now, &[(BatteryChannel::Aux, 4.0), (BatteryChannel::Aux, 50.0)]);

        let fired = engine.evaluate(&s, now);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].soc, 4.0);
        assert_eq!(engine.deadline_for(BatteryChannel::Aux), now + 5 * MINUTE);
        assert_eq!(engine.next_allowed_time(), now + 5 * MINUTE);
    }

    #[test]
    fn test_per_channel_deadline_is_monotonic() {
        let mut engine =
            SuppressionEngine::with_config(t0(), Cooldowns::default(), CooldownMode::PerChannel);
        let socs = [3.0, 50.0, 8.0, 18.0, 1.0, 99.0, 6.0];
        let mut now = t0();
        let mut previous = engine.next_allowed_time();
        let mut previous_rear = engine.deadline_for(BatteryChannel::Rear2);

        for (i, soc) in socs.iter().cycle().take(40).enumerate() {
            now = now + Duration::from_secs(97 * (i as u64 % 7 + 1));
            let s = status(now, &[(BatteryChannel::Rear2, *soc), (BatteryChannel::Front2, 30.0 - soc)]);
            engine.evaluate(&s, now);
            assert!(engine.next_allowed_time() >= previous);
            assert!(engine.deadline_for(BatteryChannel::Rear2) >= previous_rear);
            previous = engine.next_allowed_time();
            previous_rear = engine.deadline_for(BatteryChannel::Rear2);
        }
    }

    #[test]
    fn test_custom_cooldowns() {
        let cooldowns = Cooldowns {
            critical: Duration::from_secs(30),
            ..Cooldowns::default()
        };
        let mut engine = SuppressionEngine::with_config(t0(), cooldowns, CooldownMode::Global);
        let now = t0() + Duration::from_secs(1);
        engine.evaluate(&status(now, &[(BatteryChannel::Front1, 1.0)]), now);
        assert_eq!(engine.next_allowed_time(), now + Duration::from_secs(30));
    }
}
