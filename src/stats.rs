use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::engine::day_bounds;
use crate::model::Shift;

/// Totals over the shifts starting inside a date range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftStats {
    pub total_shifts: usize,
    pub total_hours: f64,
    pub total_overtime: f64,
    pub shifts_by_title: BTreeMap<String, usize>,
    pub allowances_by_name: BTreeMap<String, f64>,
}

/// Single pass over `shifts`, counting those whose start falls on a local day
/// in `from..=to` (in `tz`). An inverted range yields empty stats.
pub fn compute<'a>(
    shifts: impl IntoIterator<Item = &'a Shift>,
    from: NaiveDate,
    to: NaiveDate,
    tz: Tz,
) -> ShiftStats {
    let (lower, _) = day_bounds(from, tz);
    let (_, upper) = day_bounds(to, tz);

    shifts
        .into_iter()
        .filter(|s| s.start >= lower && s.start <= upper)
        .fold(ShiftStats::default(), |mut acc, shift| {
            acc.total_shifts += 1;
            acc.total_hours += shift.hours();
            acc.total_overtime += shift.overtime_hours.unwrap_or(0.0);
            *acc.shifts_by_title.entry(shift.title.clone()).or_default() += 1;
            for allowance in shift.allowances.iter().flatten() {
                *acc.allowances_by_name.entry(allowance.name.clone()).or_default() += allowance.amount;
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::single_shift;
    use crate::model::{Allowance, ShiftTemplate};
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn shift(title: &str, d: u32, start_h: u32, end_h: u32) -> Shift {
        let start = Utc.with_ymd_and_hms(2025, 6, d, start_h, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, d, end_h, 0, 0).unwrap();
        single_shift(&ShiftTemplate::new(title, start, end))
    }

    #[test]
    fn totals_within_range() {
        let mut a = shift("Morning", 2, 6, 14);
        a.overtime_hours = Some(1.5);
        a.allowances = Some(vec![
            Allowance { name: "Meal".into(), amount: 8.0 },
            Allowance { name: "Transport".into(), amount: 4.5 },
        ]);
        let mut b = shift("Morning", 3, 6, 14);
        b.allowances = Some(vec![Allowance { name: "Meal".into(), amount: 8.0 }]);
        let c = shift("Night", 4, 12, 16);
        let outside = shift("Morning", 20, 6, 14);

        let all = [a, b, c, outside];
        let stats = compute(&all, day(1), day(10), chrono_tz::UTC);

        assert_eq!(stats.total_shifts, 3);
        assert_eq!(stats.total_hours, 20.0);
        assert_eq!(stats.total_overtime, 1.5);
        assert_eq!(stats.shifts_by_title["Morning"], 2);
        assert_eq!(stats.shifts_by_title["Night"], 1);
        assert_eq!(stats.allowances_by_name["Meal"], 16.0);
        assert_eq!(stats.allowances_by_name["Transport"], 4.5);
    }

    #[test]
    fn range_days_are_inclusive() {
        let early = shift("Edge", 1, 0, 1);
        let late = shift("Edge", 10, 23, 23);
        let stats = compute(&[early, late], day(1), day(10), chrono_tz::UTC);
        assert_eq!(stats.total_shifts, 2);
    }

    #[test]
    fn range_follows_zone() {
        // 23:00 UTC on Jun 10 is already Jun 11 in Rome.
        let s = shift("Late", 10, 23, 23);
        let utc = compute(std::slice::from_ref(&s), day(10), day(10), chrono_tz::UTC);
        let rome = compute(std::slice::from_ref(&s), day(10), day(10), chrono_tz::Europe::Rome);
        assert_eq!(utc.total_shifts, 1);
        assert_eq!(rome.total_shifts, 0);
    }

    #[test]
    fn empty_and_inverted_ranges() {
        assert_eq!(compute(&Vec::<Shift>::new(), day(1), day(30), chrono_tz::UTC), ShiftStats::default());
        let s = shift("X", 5, 9, 17);
        assert_eq!(compute(&[s], day(10), day(1), chrono_tz::UTC).total_shifts, 0);
    }
}
