use crate::backup::{parse_backup, ImportError, ImportReport};
use crate::engine::{detach, materialize, plan_series_update, series_members};
use crate::model::*;
use crate::notify::ShiftEvent;
use crate::observability::{record_expansion, IMPORT_ACCEPTED_TOTAL, IMPORT_REJECTED_TOTAL};

use super::{validate_title, EditScope, ShiftStore, StoreError};

impl ShiftStore {
    /// Add one shift, or a whole series when `repetition` is given.
    /// Returns everything that was added, in chronological order.
    pub async fn add_shift(
        &self,
        template: ShiftTemplate,
        repetition: Option<Repetition>,
    ) -> Result<Vec<Shift>, StoreError> {
        let template = self.prepare(template)?;
        let added = materialize(
            &template,
            repetition.as_ref(),
            self.clock.now(),
            &self.settings.limits,
        );
        if repetition.is_some() {
            record_expansion(added.len());
        }

        let mut shifts = self.shifts.write().await;
        let event = Event::ShiftsAdded { shifts: added.clone() };
        self.commit(&mut shifts, &event, "add").await;
        drop(shifts);

        tracing::info!(title = %template.title, count = added.len(), "shifts added");
        self.notify.added(&added);
        Ok(added)
    }

    /// Replace a single shift by id.
    ///
    /// The replacement keeps its series id, or takes its own id as series
    /// id when it leaves the series. Its repetition rule must agree with
    /// `is_recurring`.
    pub async fn update_shift(&self, shift: Shift) -> Result<(), StoreError> {
        validate_title(&shift.title)?;
        if !shift.rule_matches_flag() {
            return Err(StoreError::InvalidTemplate(
                "repetition must be present exactly when recurring",
            ));
        }
        let mut shifts = self.shifts.write().await;
        let Some(existing) = shifts.iter().find(|s| s.id == shift.id) else {
            return Err(StoreError::NotFound(shift.id));
        };
        if shift.series_id != existing.series_id && shift.series_id.as_str() != shift.id.as_str() {
            return Err(StoreError::InvalidTemplate("series id cannot be reassigned"));
        }
        let event = Event::ShiftUpdated { shift: shift.clone() };
        self.commit(&mut shifts, &event, "update").await;
        drop(shifts);

        tracing::debug!(id = %shift.id, "shift updated");
        self.notify.send(ShiftEvent::Updated { shift });
        Ok(())
    }

    /// Edit the shift `id` with the fields of `template`.
    ///
    /// `EditScope::Series` regenerates the shift's whole series with its
    /// current repetition. `EditScope::Instance`, and any edit of a shift
    /// without a rule, detaches and rewrites just this one.
    pub async fn edit(
        &self,
        id: &ShiftId,
        template: ShiftTemplate,
        scope: EditScope,
    ) -> Result<Vec<Shift>, StoreError> {
        let current = self
            .get(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        match scope {
            EditScope::Series if current.is_recurring && current.repetition.is_some() => {
                self.update_series(&current.series_id, template, current.repetition)
                    .await
            }
            _ => {
                let template = self.prepare(template)?;
                let detached = detach(&current, &template);
                self.update_shift(detached.clone()).await?;
                Ok(vec![detached])
            }
        }
    }

    /// Delete every member of `series_id` and expand `template` into a fresh
    /// series under a new series id. Per-instance customizations are dropped.
    pub async fn update_series(
        &self,
        series_id: &SeriesId,
        template: ShiftTemplate,
        repetition: Option<Repetition>,
    ) -> Result<Vec<Shift>, StoreError> {
        let template = self.prepare(template)?;
        let now = self.clock.now();

        let mut shifts = self.shifts.write().await;
        let plan = plan_series_update(
            &shifts,
            series_id,
            &template,
            repetition.as_ref(),
            now,
            &self.settings.limits,
        )?;
        if repetition.is_some() {
            record_expansion(plan.added.len());
        }
        let event = Event::SeriesReplaced {
            removed: plan.removed.clone(),
            added: plan.added.clone(),
        };
        self.commit(&mut shifts, &event, "update_series").await;
        drop(shifts);

        tracing::info!(
            old_series = %series_id,
            removed = plan.removed.len(),
            added = plan.added.len(),
            "series regenerated"
        );
        self.notify.send(ShiftEvent::Removed { ids: plan.removed });
        self.notify.added(&plan.added);
        Ok(plan.added)
    }

    pub async fn delete_shift(&self, id: &ShiftId) -> Result<Shift, StoreError> {
        let mut shifts = self.shifts.write().await;
        let removed = shifts
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let event = Event::ShiftsRemoved { ids: vec![id.clone()] };
        self.commit(&mut shifts, &event, "delete").await;
        drop(shifts);

        tracing::debug!(id = %id, "shift deleted");
        self.notify.send(ShiftEvent::Removed { ids: vec![id.clone()] });
        Ok(removed)
    }

    /// Delete every shift carrying `series_id`. Detached instances carry their
    /// own series id and are not reached. Returns the number removed.
    pub async fn delete_series(&self, series_id: &SeriesId) -> usize {
        let mut shifts = self.shifts.write().await;
        let ids = series_members(&shifts, series_id);
        if ids.is_empty() {
            return 0;
        }
        let event = Event::ShiftsRemoved { ids: ids.clone() };
        self.commit(&mut shifts, &event, "delete_series").await;
        drop(shifts);

        let count = ids.len();
        tracing::info!(series_id = %series_id, count, "series deleted");
        self.notify.send(ShiftEvent::Removed { ids });
        count
    }

    /// Delete the shift `id`, or its whole series. Returns the number removed.
    pub async fn remove(&self, id: &ShiftId, scope: EditScope) -> Result<usize, StoreError> {
        match scope {
            EditScope::Instance => self.delete_shift(id).await.map(|_| 1),
            EditScope::Series => {
                let shift = self
                    .get(id)
                    .await
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                Ok(self.delete_series(&shift.series_id).await)
            }
        }
    }

    /// Drop the whole collection. Returns the number removed.
    pub async fn delete_all(&self) -> usize {
        let mut shifts = self.shifts.write().await;
        let count = shifts.len();
        self.commit(&mut shifts, &Event::Snapshot { shifts: Vec::new() }, "delete_all")
            .await;
        drop(shifts);

        tracing::info!(count, "all shifts deleted");
        self.notify.send(ShiftEvent::Replaced { count: 0 });
        count
    }

    /// Replace the collection with the valid records of a JSON backup.
    /// Naive timestamps are read in the store's default zone.
    pub async fn import_json(&self, text: &str) -> Result<ImportReport, StoreError> {
        let (imported, report) = match parse_backup(text, self.settings.timezone) {
            Ok(parsed) => parsed,
            Err(e) => {
                if let ImportError::NoValidShifts { rejected } = &e {
                    metrics::counter!(IMPORT_REJECTED_TOTAL).increment(*rejected as u64);
                }
                tracing::warn!("import rejected: {e}");
                return Err(e.into());
            }
        };
        metrics::counter!(IMPORT_ACCEPTED_TOTAL).increment(report.imported as u64);
        metrics::counter!(IMPORT_REJECTED_TOTAL).increment(report.rejected as u64);

        let mut shifts = self.shifts.write().await;
        self.commit(&mut shifts, &Event::Snapshot { shifts: imported }, "import")
            .await;
        drop(shifts);

        tracing::info!(
            imported = report.imported,
            rejected = report.rejected,
            "backup imported"
        );
        self.notify.send(ShiftEvent::Replaced {
            count: report.imported,
        });
        Ok(report)
    }
}
