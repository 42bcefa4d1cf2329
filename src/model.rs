use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// Identifier of one concrete shift instance. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftId(String);

impl ShiftId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShiftId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier shared by every instance expanded from one template.
/// A standalone shift's series id equals its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ShiftId> for SeriesId {
    fn from(id: &ShiftId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&str> for SeriesId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftColor {
    #[default]
    Sky,
    Green,
    Amber,
    Rose,
    Indigo,
    Teal,
    Fuchsia,
    Slate,
}

impl ShiftColor {
    pub const ALL: [ShiftColor; 8] = [
        ShiftColor::Sky,
        ShiftColor::Green,
        ShiftColor::Amber,
        ShiftColor::Rose,
        ShiftColor::Indigo,
        ShiftColor::Teal,
        ShiftColor::Fuchsia,
        ShiftColor::Slate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftColor::Sky => "sky",
            ShiftColor::Green => "green",
            ShiftColor::Amber => "amber",
            ShiftColor::Rose => "rose",
            ShiftColor::Indigo => "indigo",
            ShiftColor::Teal => "teal",
            ShiftColor::Fuchsia => "fuchsia",
            ShiftColor::Slate => "slate",
        }
    }
}

impl FromStr for ShiftColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShiftColor::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown color: {s}"))
    }
}

/// A named extra payment attached to a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    pub name: String,
    pub amount: f64,
}

/// Step unit of a repetition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Days,
    Weeks,
    Months,
    Year,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Days => "days",
            Frequency::Weeks => "weeks",
            Frequency::Months => "months",
            Frequency::Year => "year",
        }
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "days" => Ok(Frequency::Days),
            "weeks" => Ok(Frequency::Weeks),
            "months" => Ok(Frequency::Months),
            "year" => Ok(Frequency::Year),
            other => Err(EngineError::InvalidRepetition(format!(
                "unrecognized frequency: {other}"
            ))),
        }
    }
}

/// How a recurring template repeats. `interval` is not validated here:
/// non-positive steps are bounded by the instance cap during expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRepetition", into = "RawRepetition")]
pub struct Repetition {
    pub frequency: Frequency,
    pub interval: i64,
}

/// Wire form: frequency travels as its string name in every format.
#[derive(Clone, Serialize, Deserialize)]
struct RawRepetition {
    frequency: String,
    interval: i64,
}

impl TryFrom<RawRepetition> for Repetition {
    type Error = EngineError;

    fn try_from(raw: RawRepetition) -> Result<Self, Self::Error> {
        Ok(Self {
            frequency: raw.frequency.parse()?,
            interval: raw.interval,
        })
    }
}

impl From<Repetition> for RawRepetition {
    fn from(r: Repetition) -> Self {
        Self {
            frequency: r.frequency.as_str().to_string(),
            interval: r.interval,
        }
    }
}

impl Repetition {
    pub fn new(frequency: Frequency, interval: i64) -> Self {
        Self { frequency, interval }
    }

    /// Parse `"<interval>:<unit>"`, e.g. `"2:weeks"`.
    pub fn parse(spec: &str) -> Result<Self, EngineError> {
        let (interval, unit) = spec.split_once(':').ok_or_else(|| {
            EngineError::InvalidRepetition(format!("expected <interval>:<unit>, got {spec}"))
        })?;
        let interval = interval.trim().parse::<i64>().map_err(|_| {
            EngineError::InvalidRepetition(format!("interval is not an integer: {interval}"))
        })?;
        Ok(Self {
            frequency: unit.trim().parse()?,
            interval,
        })
    }
}

/// Shift payload without identity, used to seed one shift or a whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTemplate {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub color: ShiftColor,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub overtime_hours: Option<f64>,
    #[serde(default)]
    pub allowances: Option<Vec<Allowance>>,
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl ShiftTemplate {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            color: ShiftColor::default(),
            notes: None,
            overtime_hours: None,
            allowances: None,
            timezone: None,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub series_id: SeriesId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color: ShiftColor,
    pub is_recurring: bool,
    #[serde(default)]
    pub repetition: Option<Repetition>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub overtime_hours: Option<f64>,
    #[serde(default)]
    pub allowances: Option<Vec<Allowance>>,
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl Shift {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// A repetition rule is present exactly when the shift is recurring.
    pub fn rule_matches_flag(&self) -> bool {
        self.is_recurring == self.repetition.is_some()
    }

    pub fn hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }

    /// Closed-interval overlap, so a shift ending exactly at `from` still counts.
    pub fn touches(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start <= to && self.end >= from
    }

    /// The template this shift would regenerate from.
    pub fn template(&self) -> ShiftTemplate {
        ShiftTemplate {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            color: self.color,
            notes: self.notes.clone(),
            overtime_hours: self.overtime_hours,
            allowances: self.allowances.clone(),
            timezone: self.timezone,
        }
    }
}

/// Journal record format. Every mutation the store makes is one event, so a
/// series replacement is replayed all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ShiftsAdded {
        shifts: Vec<Shift>,
    },
    ShiftUpdated {
        shift: Shift,
    },
    ShiftsRemoved {
        ids: Vec<ShiftId>,
    },
    SeriesReplaced {
        removed: Vec<ShiftId>,
        added: Vec<Shift>,
    },
    /// Full collection; used by import, delete-all and compaction.
    Snapshot {
        shifts: Vec<Shift>,
    },
}

impl Event {
    /// Apply this event to a flat collection.
    pub fn apply(&self, shifts: &mut Vec<Shift>) {
        match self {
            Event::ShiftsAdded { shifts: added } => shifts.extend(added.iter().cloned()),
            Event::ShiftUpdated { shift } => {
                if let Some(slot) = shifts.iter_mut().find(|s| s.id == shift.id) {
                    *slot = shift.clone();
                }
            }
            Event::ShiftsRemoved { ids } => shifts.retain(|s| !ids.contains(&s.id)),
            Event::SeriesReplaced { removed, added } => {
                shifts.retain(|s| !removed.contains(&s.id));
                shifts.extend(added.iter().cloned());
            }
            Event::Snapshot { shifts: all } => *shifts = all.clone(),
        }
    }
}
