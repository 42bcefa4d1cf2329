use chrono::{Days, NaiveDate};

use crate::backup::export_json;
use crate::engine::{day_bounds, to_local};
use crate::model::*;
use crate::stats::{compute, ShiftStats};

use super::{ShiftStore, StoreError};

fn by_start(mut shifts: Vec<Shift>) -> Vec<Shift> {
    shifts.sort_by_key(|s| s.start);
    shifts
}

impl ShiftStore {
    pub async fn len(&self) -> usize {
        self.shifts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shifts.read().await.is_empty()
    }

    /// Every shift, sorted by start.
    pub async fn list(&self) -> Vec<Shift> {
        by_start(self.shifts.read().await.clone())
    }

    pub async fn get(&self, id: &ShiftId) -> Option<Shift> {
        self.shifts.read().await.iter().find(|s| &s.id == id).cloned()
    }

    /// Members of one series, sorted by start.
    pub async fn series(&self, series_id: &SeriesId) -> Vec<Shift> {
        let shifts = self.shifts.read().await;
        by_start(
            shifts
                .iter()
                .filter(|s| &s.series_id == series_id)
                .cloned()
                .collect(),
        )
    }

    /// Shifts that have not ended before today's local midnight.
    pub async fn upcoming(&self) -> Vec<Shift> {
        let tz = self.settings.timezone;
        let today = to_local(self.clock.now(), tz).date();
        let (midnight, _) = day_bounds(today, tz);

        let shifts = self.shifts.read().await;
        by_start(shifts.iter().filter(|s| s.end >= midnight).cloned().collect())
    }

    /// Shifts overlapping the local day `date`, including ones that merely
    /// start or end on its boundary.
    pub async fn on_day(&self, date: NaiveDate) -> Vec<Shift> {
        let (from, to) = day_bounds(date, self.settings.timezone);
        let shifts = self.shifts.read().await;
        by_start(shifts.iter().filter(|s| s.touches(from, to)).cloned().collect())
    }

    pub async fn stats(&self, from: NaiveDate, to: NaiveDate) -> ShiftStats {
        let shifts = self.shifts.read().await;
        compute(shifts.iter(), from, to, self.settings.timezone)
    }

    /// Stats over the configured default window ending today.
    pub async fn recent_stats(&self) -> ShiftStats {
        let tz = self.settings.timezone;
        let to = to_local(self.clock.now(), tz).date();
        let span = u64::from(self.settings.stats_default_days.saturating_sub(1));
        let from = to.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
        self.stats(from, to).await
    }

    /// The collection as a pretty-printed JSON array, in start order.
    pub async fn export_json(&self) -> Result<String, StoreError> {
        let shifts = self.list().await;
        export_json(&shifts).map_err(|e| StoreError::Export(e.to_string()))
    }
}
