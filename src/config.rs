//! Engine Configuration
//!
//! Every setting has a default matching competition rules. Deployments
//! override them through `SPEEDCUBE_*` environment variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `SPEEDCUBE_STOPWATCH_TICK_MS` | stopwatch display cadence |
//! | `SPEEDCUBE_INSPECTION_MS` | inspection length (thresholds follow) |
//! | `SPEEDCUBE_INSPECTION_PLUS2_MS` | +2 threshold |
//! | `SPEEDCUBE_INSPECTION_DNF_MS` | DNF threshold |
//! | `SPEEDCUBE_INSPECTION_TICK_MS` | countdown cadence |
//! | `SPEEDCUBE_INSPECTION_REPEAT_COMPLETE` | re-send completion every tick |
//! | `SPEEDCUBE_SCRAMBLE_STRATEGY` | `official` or `constrained` |
//! | `SPEEDCUBE_SCRAMBLE_LENGTH` | constrained scramble length |
//! | `SPEEDCUBE_OFFICIAL_MOVE_COUNT` | official scramble move count |
//! | `SPEEDCUBE_PUZZLE_SIZE` | official puzzle layers |
//! | `SPEEDCUBE_SCRAMBLER_COMMAND` | external scrambler command line |
//! | `SPEEDCUBE_SCRAMBLER_TIMEOUT_MS` | external scrambler timeout |
//! | `SPEEDCUBE_LEADERBOARD_SIZE` | leaderboard entries per date |
//!
//! Unparsable values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::competition::LeaderboardConfig;
use crate::scramble::ScrambleConfig;
use crate::timing::{InspectionConfig, StopwatchConfig};

/// All engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Solve stopwatch.
    pub stopwatch: StopwatchConfig,
    /// Inspection countdown.
    pub inspection: InspectionConfig,
    /// Scramble generation.
    pub scramble: ScrambleConfig,
    /// Leaderboards.
    pub leaderboard: LeaderboardConfig,
}

impl EngineConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| -> Option<String> {
            lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };
        let millis = |key: &str| parse::<u64>(key, get(key)).map(Duration::from_millis);

        let mut config = Self::default();

        if let Some(tick) = millis("SPEEDCUBE_STOPWATCH_TICK_MS") {
            config.stopwatch.tick_interval = tick;
        }

        if let Some(duration) = millis("SPEEDCUBE_INSPECTION_MS") {
            config.inspection = InspectionConfig {
                tick_interval: config.inspection.tick_interval,
                ..InspectionConfig::with_duration(duration)
            };
        }
        if let Some(plus2) = millis("SPEEDCUBE_INSPECTION_PLUS2_MS") {
            config.inspection.plus2_threshold = plus2;
        }
        if let Some(dnf) = millis("SPEEDCUBE_INSPECTION_DNF_MS") {
            config.inspection.dnf_threshold = dnf;
        }
        if let Some(tick) = millis("SPEEDCUBE_INSPECTION_TICK_MS") {
            config.inspection.tick_interval = tick;
        }
        if let Some(flag) = get("SPEEDCUBE_INSPECTION_REPEAT_COMPLETE") {
            config.inspection.repeat_complete = flag == "true" || flag == "1";
        }

        if let Some(strategy) = get("SPEEDCUBE_SCRAMBLE_STRATEGY") {
            match strategy.parse() {
                Ok(strategy) => config.scramble.strategy = strategy,
                Err(err) => warn!(error = %err, "ignoring SPEEDCUBE_SCRAMBLE_STRATEGY"),
            }
        }
        if let Some(length) = parse("SPEEDCUBE_SCRAMBLE_LENGTH", get("SPEEDCUBE_SCRAMBLE_LENGTH")) {
            config.scramble.constrained_length = length;
        }
        if let Some(count) = parse("SPEEDCUBE_OFFICIAL_MOVE_COUNT", get("SPEEDCUBE_OFFICIAL_MOVE_COUNT")) {
            config.scramble.official_move_count = count;
        }
        if let Some(size) = parse("SPEEDCUBE_PUZZLE_SIZE", get("SPEEDCUBE_PUZZLE_SIZE")) {
            config.scramble.puzzle_size = size;
        }
        if let Some(command) = get("SPEEDCUBE_SCRAMBLER_COMMAND") {
            config.scramble.scrambler_command = Some(command);
        }
        if let Some(timeout) = millis("SPEEDCUBE_SCRAMBLER_TIMEOUT_MS") {
            config.scramble.scrambler_timeout = timeout;
        }

        if let Some(size) = parse("SPEEDCUBE_LEADERBOARD_SIZE", get("SPEEDCUBE_LEADERBOARD_SIZE")) {
            config.leaderboard.size = size;
        }

        config
    }
}

fn parse<T: FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::ScrambleStrategy;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> EngineConfig {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.stopwatch.tick_interval, Duration::from_millis(10));
        assert_eq!(config.inspection.duration, Duration::from_millis(15_000));
        assert_eq!(config.inspection.plus2_threshold, Duration::from_millis(15_000));
        assert_eq!(config.inspection.dnf_threshold, Duration::from_millis(17_000));
        assert_eq!(config.inspection.tick_interval, Duration::from_millis(100));
        assert!(!config.inspection.repeat_complete);
        assert_eq!(config.scramble.strategy, ScrambleStrategy::Official);
        assert_eq!(config.scramble.constrained_length, 25);
        assert_eq!(config.scramble.official_move_count, 20);
        assert_eq!(config.scramble.puzzle_size, 3);
        assert_eq!(config.leaderboard.size, 5);

        assert_eq!(load(&[]), config);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SPEEDCUBE_STOPWATCH_TICK_MS", "16"),
            ("SPEEDCUBE_INSPECTION_MS", "8000"),
            ("SPEEDCUBE_INSPECTION_TICK_MS", "50"),
            ("SPEEDCUBE_INSPECTION_REPEAT_COMPLETE", "true"),
            ("SPEEDCUBE_SCRAMBLE_STRATEGY", "constrained"),
            ("SPEEDCUBE_SCRAMBLE_LENGTH", "30"),
            ("SPEEDCUBE_SCRAMBLER_COMMAND", "tnoodle scramble"),
            ("SPEEDCUBE_SCRAMBLER_TIMEOUT_MS", "250"),
            ("SPEEDCUBE_LEADERBOARD_SIZE", "10"),
        ]);

        assert_eq!(config.stopwatch.tick_interval, Duration::from_millis(16));
        assert_eq!(config.inspection.duration, Duration::from_millis(8_000));
        assert_eq!(config.inspection.plus2_threshold, Duration::from_millis(8_000));
        assert_eq!(config.inspection.dnf_threshold, Duration::from_millis(10_000));
        assert_eq!(config.inspection.tick_interval, Duration::from_millis(50));
        assert!(config.inspection.repeat_complete);
        assert_eq!(config.scramble.strategy, ScrambleStrategy::Constrained);
        assert_eq!(config.scramble.constrained_length, 30);
        assert_eq!(config.scramble.scrambler_command.as_deref(), Some("tnoodle scramble"));
        assert_eq!(config.scramble.scrambler_timeout, Duration::from_millis(250));
        assert_eq!(config.leaderboard.size, 10);
    }

    #[test]
    fn test_explicit_thresholds_win() {
        let config = load(&[
            ("SPEEDCUBE_INSPECTION_MS", "8000"),
            ("SPEEDCUBE_INSPECTION_PLUS2_MS", "9000"),
            ("SPEEDCUBE_INSPECTION_DNF_MS", "12000"),
        ]);
        assert_eq!(config.inspection.plus2_threshold, Duration::from_millis(9_000));
        assert_eq!(config.inspection.dnf_threshold, Duration::from_millis(12_000));
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = load(&[
            ("SPEEDCUBE_LEADERBOARD_SIZE", "lots"),
            ("SPEEDCUBE_SCRAMBLE_STRATEGY", "tnoodle"),
            ("SPEEDCUBE_PUZZLE_SIZE", "-3"),
            ("SPEEDCUBE_SCRAMBLER_COMMAND", "   "),
        ]);
        assert_eq!(config, EngineConfig::default());
    }
}
