use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::limits::Horizon;
use crate::model::Frequency;

/// Wall-clock time of `instant` in `tz`.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Resolve a wall-clock time in `tz` to an instant.
///
/// DST fold: the earlier instant wins. DST gap: the time is pushed forward one
/// hour, past the gap. `None` only when the result is out of range.
pub fn from_local(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = local.checked_add_signed(TimeDelta::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
        }
    }
}

/// Advance a wall-clock time by `count` units. `None` on overflow.
///
/// Months roll over instead of clamping: Jan 31 + 1 month is the first of
/// February plus 30 days, i.e. Mar 3 (Mar 2 in a leap year).
pub fn step_local(local: NaiveDateTime, unit: Frequency, count: i64) -> Option<NaiveDateTime> {
    match unit {
        Frequency::Days => add_days(local, count),
        Frequency::Weeks => add_days(local, count.checked_mul(7)?),
        Frequency::Months => add_months(local, count),
        Frequency::Year => add_months(local, count.checked_mul(12)?),
    }
}

fn add_days(local: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    local.checked_add_signed(TimeDelta::try_days(days)?)
}

fn add_months(local: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let total = i64::from(local.year())
        .checked_mul(12)?
        .checked_add(i64::from(local.month0()))?
        .checked_add(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(local.day0())))?;
    Some(date.and_time(local.time()))
}

/// The instant `horizon` after `now`, measured on the calendar of `tz`.
/// Saturates at the latest representable instant.
pub fn horizon_deadline(now: DateTime<Utc>, tz: Tz, horizon: &Horizon) -> DateTime<Utc> {
    step_local(to_local(now, tz), horizon.unit, i64::from(horizon.amount))
        .and_then(|local| from_local(local, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// First and last instant of a local calendar day, both inclusive.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from_local(date.and_time(NaiveTime::MIN), tz).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = date
        .succ_opt()
        .and_then(|next| from_local(next.and_time(NaiveTime::MIN), tz))
        .map(|next| next - TimeDelta::milliseconds(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}
