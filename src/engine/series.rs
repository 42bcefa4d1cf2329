use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::UTC;

use crate::limits::Limits;
use crate::model::*;

use super::calendar::{from_local, horizon_deadline, step_local, to_local};
use super::EngineError;

/// Outcome of a series-wide edit: the members to drop and their replacements.
/// The store applies both halves as one journal record.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesUpdate {
    pub removed: Vec<ShiftId>,
    pub added: Vec<Shift>,
}

fn instance(
    template: &ShiftTemplate,
    id: ShiftId,
    series_id: SeriesId,
    repetition: Option<Repetition>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Shift {
    Shift {
        id,
        series_id,
        title: template.title.clone(),
        start,
        end,
        color: template.color,
        is_recurring: repetition.is_some(),
        repetition,
        notes: template.notes.clone(),
        overtime_hours: template.overtime_hours,
        allowances: template.allowances.clone(),
        timezone: template.timezone,
    }
}

/// A standalone shift: its series id is its own id.
pub fn single_shift(template: &ShiftTemplate) -> Shift {
    let id = ShiftId::generate();
    let series_id = SeriesId::from(&id);
    instance(template, id, series_id, None, template.start, template.end)
}

/// Expand `template` into a bounded, chronological series.
///
/// The template itself is always instance #1. Each later start is the previous
/// one stepped on the wall clock of the template's zone (UTC when unset).
/// Expansion stops once a start reaches `now + max_horizon`, once
/// `max_instances` have been emitted, or when a step leaves the representable
/// range. The count cap is checked on every iteration, which is what bounds a
/// zero or negative interval.
pub fn generate_series(
    template: &ShiftTemplate,
    repetition: &Repetition,
    now: DateTime<Utc>,
    limits: &Limits,
) -> Vec<Shift> {
    let tz = template.timezone.unwrap_or(UTC);
    let series_id = SeriesId::generate();
    let duration: TimeDelta = template.duration();
    let deadline = horizon_deadline(now, tz, &limits.max_horizon);
    let cap = limits.max_instances.max(1);

    let mut shifts = Vec::with_capacity(cap.min(256));
    let mut cursor = to_local(template.start, tz);
    let mut start = template.start;
    let mut end = template.end;

    loop {
        shifts.push(instance(
            template,
            ShiftId::generate(),
            series_id.clone(),
            Some(*repetition),
            start,
            end,
        ));
        if shifts.len() >= cap {
            break;
        }

        let Some(next_local) = step_local(cursor, repetition.frequency, repetition.interval) else {
            break;
        };
        let Some(next_start) = from_local(next_local, tz) else {
            break;
        };
        if next_start >= deadline {
            break;
        }
        let Some(next_end) = next_start.checked_add_signed(duration) else {
            break;
        };
        cursor = next_local;
        start = next_start;
        end = next_end;
    }

    tracing::debug!(
        series_id = %series_id,
        instances = shifts.len(),
        frequency = repetition.frequency.as_str(),
        interval = repetition.interval,
        "expanded series"
    );
    shifts
}

/// Build the shifts a template produces: one standalone shift without a
/// repetition, a bounded series with one.
pub fn materialize(
    template: &ShiftTemplate,
    repetition: Option<&Repetition>,
    now: DateTime<Utc>,
    limits: &Limits,
) -> Vec<Shift> {
    match repetition {
        Some(rule) => generate_series(template, rule, now, limits),
        None => vec![single_shift(template)],
    }
}

/// Ids of every shift carrying `series_id`.
pub fn series_members(shifts: &[Shift], series_id: &SeriesId) -> Vec<ShiftId> {
    shifts
        .iter()
        .filter(|s| &s.series_id == series_id)
        .map(|s| s.id.clone())
        .collect()
}

/// Delete-then-regenerate plan for a whole series.
///
/// Every current member is dropped and a fresh series (new ids, new series id)
/// is expanded from `template`. Customizations made to individual members are
/// discarded: editing the whole series resets each instance to the template.
/// Without a repetition the replacement is a single standalone shift.
pub fn plan_series_update(
    shifts: &[Shift],
    series_id: &SeriesId,
    template: &ShiftTemplate,
    repetition: Option<&Repetition>,
    now: DateTime<Utc>,
    limits: &Limits,
) -> Result<SeriesUpdate, EngineError> {
    let removed = series_members(shifts, series_id);
    if removed.is_empty() {
        return Err(EngineError::SeriesNotFound(series_id.clone()));
    }
    let added = materialize(template, repetition, now, limits);
    Ok(SeriesUpdate { removed, added })
}

/// Turn one series member into a standalone shift with the edited fields.
///
/// The instance keeps its id but takes its own id as series id, so later
/// series-wide edits and deletes no longer reach it.
pub fn detach(shift: &Shift, template: &ShiftTemplate) -> Shift {
    instance(
        template,
        shift.id.clone(),
        SeriesId::from(&shift.id),
        None,
        template.start,
        template.end,
    )
}
