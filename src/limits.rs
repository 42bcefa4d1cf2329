use crate::model::Frequency;

/// Hard cap on instances produced by one series expansion.
pub const DEFAULT_MAX_INSTANCES: usize = 200;
/// How far past "now" the generator walks, in calendar years.
pub const DEFAULT_HORIZON_YEARS: u32 = 2;
/// Instances handed to notification subscribers per added series.
pub const DEFAULT_NOTIFY_PREVIEW: usize = 10;
/// Journal appends before the log is rewritten as a snapshot.
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
/// Default statistics window, in days back from today.
pub const DEFAULT_STATS_DAYS: u32 = 30;

pub const MAX_TITLE_LEN: usize = 1024;
pub const MAX_IMPORT_BYTES: usize = 64 * 1024 * 1024;

/// Calendar distance, expressed in the same units a repetition steps by.
///
/// Shares `Frequency` with repetition rules so the deadline is computed by
/// the same `step_local` wall-clock stepping as the series itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub unit: Frequency,
    pub amount: u32,
}

impl Horizon {
    pub fn years(amount: u32) -> Self {
        Self { unit: Frequency::Year, amount }
    }

    pub fn days(amount: u32) -> Self {
        Self { unit: Frequency::Days, amount }
    }
}

/// Bounds applied to every series expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_instances: usize,
    pub max_horizon: Horizon,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            max_horizon: Horizon::years(DEFAULT_HORIZON_YEARS),
        }
    }
}
