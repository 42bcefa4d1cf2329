use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::limits::*;

/// Runtime configuration, read from `SHIFTBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Zone applied to templates and imported naive timestamps that carry none.
    pub timezone: Tz,
    pub limits: Limits,
    pub notify_preview: usize,
    pub compact_threshold: u64,
    pub stats_default_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            timezone: chrono_tz::UTC,
            limits: Limits::default(),
            notify_preview: DEFAULT_NOTIFY_PREVIEW,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            stats_default_days: DEFAULT_STATS_DAYS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Values that are missing
    /// keep their default; values that do not parse (or are zero where a
    /// positive number is required) are logged and also keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let data_dir = lookup("SHIFTBOOK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let timezone = parsed(&lookup, "SHIFTBOOK_TIMEZONE", defaults.timezone);
        let max_instances = positive(&lookup, "SHIFTBOOK_MAX_INSTANCES", DEFAULT_MAX_INSTANCES);
        let horizon_years = positive(&lookup, "SHIFTBOOK_HORIZON_YEARS", DEFAULT_HORIZON_YEARS);
        let notify_preview = positive(&lookup, "SHIFTBOOK_NOTIFY_PREVIEW", DEFAULT_NOTIFY_PREVIEW);
        let compact_threshold =
            positive(&lookup, "SHIFTBOOK_COMPACT_THRESHOLD", DEFAULT_COMPACT_THRESHOLD);
        let stats_default_days =
            positive(&lookup, "SHIFTBOOK_STATS_DEFAULT_DAYS", DEFAULT_STATS_DAYS);

        Self {
            data_dir,
            timezone,
            limits: Limits {
                max_instances,
                max_horizon: Horizon::years(horizon_years),
            },
            notify_preview,
            compact_threshold,
            stats_default_days,
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("shifts.journal")
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring {key}={raw:?}: not a valid value");
            default
        }),
    }
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let value = parsed(lookup, key, default);
    if value > T::default() {
        value
    } else {
        tracing::warn!("ignoring {key}: must be greater than zero");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]);
        assert_eq!(s, Settings::default());
        assert_eq!(s.limits.max_instances, 200);
        assert_eq!(s.limits.max_horizon, Horizon::years(2));
        assert_eq!(s.journal_path(), PathBuf::from("./data/shifts.journal"));
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("SHIFTBOOK_DATA_DIR", "/tmp/shifts"),
            ("SHIFTBOOK_TIMEZONE", "Europe/Rome"),
            ("SHIFTBOOK_MAX_INSTANCES", "50"),
            ("SHIFTBOOK_HORIZON_YEARS", "1"),
            ("SHIFTBOOK_NOTIFY_PREVIEW", "3"),
            ("SHIFTBOOK_COMPACT_THRESHOLD", "10"),
        ]);
        assert_eq!(s.data_dir, PathBuf::from("/tmp/shifts"));
        assert_eq!(s.timezone, chrono_tz::Europe::Rome);
        assert_eq!(s.limits.max_instances, 50);
        assert_eq!(s.limits.max_horizon, Horizon::years(1));
        assert_eq!(s.notify_preview, 3);
        assert_eq!(s.compact_threshold, 10);
    }

    #[test]
    fn bad_values_fall_back() {
        let s = settings(&[
            ("SHIFTBOOK_TIMEZONE", "Mars/Olympus"),
            ("SHIFTBOOK_MAX_INSTANCES", "0"),
            ("SHIFTBOOK_HORIZON_YEARS", "-1"),
            ("SHIFTBOOK_COMPACT_THRESHOLD", "lots"),
        ]);
        assert_eq!(s.timezone, chrono_tz::UTC);
        assert_eq!(s.limits.max_instances, DEFAULT_MAX_INSTANCES);
        assert_eq!(s.limits.max_horizon, Horizon::years(DEFAULT_HORIZON_YEARS));
        assert_eq!(s.compact_threshold, DEFAULT_COMPACT_THRESHOLD);
    }
}
