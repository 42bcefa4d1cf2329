//! Recurrence engine: pure expansion of a template plus repetition rule into
//! concrete shifts, and the plans for series-wide edits and deletes.
//!
//! Nothing here reads the clock or touches storage; callers pass `now` and
//! the limits in and apply the returned shifts themselves.

mod calendar;
mod error;
mod series;

pub use calendar::{day_bounds, from_local, horizon_deadline, step_local, to_local};
pub use error::EngineError;
pub use series::{
    detach, generate_series, materialize, plan_series_update, series_members, single_shift,
    SeriesUpdate,
};
