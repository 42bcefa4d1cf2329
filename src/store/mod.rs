//! `ShiftStore`: owns the flat shift collection and routes every change
//! through the recurrence engine, the journal and the notify hub.

mod error;
mod mutations;
mod queries;

pub use error::StoreError;

use std::io;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};

use crate::clock::Clock;
use crate::config::Settings;
use crate::journal::Journal;
use crate::limits::MAX_TITLE_LEN;
use crate::model::{Event, Shift, ShiftTemplate};
use crate::notify::{NotifyHub, ShiftEvent};
use crate::observability::{COMPACTIONS_TOTAL, MUTATIONS_TOTAL, PERSIST_FAILURES_TOTAL};

/// Which shifts an edit or delete reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Only the given shift. A series member is detached first.
    Instance,
    /// Every shift sharing the given shift's series id.
    Series,
}

impl EditScope {
    pub fn from_flag(whole_series: bool) -> Self {
        if whole_series {
            EditScope::Series
        } else {
            EditScope::Instance
        }
    }
}

pub struct ShiftStore {
    shifts: RwLock<Vec<Shift>>,
    /// `None` for a purely in-memory store.
    journal: Option<Mutex<Journal>>,
    notify: Arc<NotifyHub>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl ShiftStore {
    /// In-memory store with nothing on disk.
    pub fn new(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self {
            shifts: RwLock::new(Vec::new()),
            journal: None,
            notify: Arc::new(NotifyHub::new(settings.notify_preview)),
            clock,
            settings,
        }
    }

    /// Open the store in `settings.data_dir`, replaying its journal.
    pub fn open(settings: Settings, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&settings.data_dir)?;
        let path = settings.journal_path();
        let (journal, shifts) = Journal::recover(&path)?;
        tracing::info!(path = %path.display(), shifts = shifts.len(), "store opened");

        Ok(Self {
            shifts: RwLock::new(shifts),
            journal: Some(Mutex::new(journal)),
            notify: Arc::new(NotifyHub::new(settings.notify_preview)),
            clock,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShiftEvent> {
        self.notify.subscribe()
    }

    /// Write any pending state to disk. A journal left dirty by an earlier
    /// failure is rewritten as a full snapshot.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let shifts = self.shifts.read().await;
        let mut journal = journal.lock().await;
        if journal.is_dirty() {
            journal.rewrite(&shifts)?;
            tracing::info!(shifts = shifts.len(), "journal healed with snapshot");
        } else {
            journal.flush_sync()?;
        }
        Ok(())
    }

    /// Validate a template and give it the default zone if it has none.
    fn prepare(&self, mut template: ShiftTemplate) -> Result<ShiftTemplate, StoreError> {
        validate_title(&template.title)?;
        template.timezone.get_or_insert(self.settings.timezone);
        Ok(template)
    }

    /// Apply + journal in one call. The caller holds the write lock, so the
    /// journal sees events in the order they hit memory.
    async fn commit(&self, shifts: &mut Vec<Shift>, event: &Event, op: &'static str) {
        event.apply(shifts);
        metrics::counter!(MUTATIONS_TOTAL, "op" => op).increment(1);

        let Some(journal) = &self.journal else { return };
        let mut journal = journal.lock().await;
        if let Err(e) = write_through(&mut journal, event, shifts, self.settings.compact_threshold) {
            tracing::error!(
                path = %journal.path().display(),
                op,
                "journal write failed, change kept in memory: {e}"
            );
            metrics::counter!(PERSIST_FAILURES_TOTAL).increment(1);
            self.notify.send(ShiftEvent::PersistenceFailed {
                message: e.to_string(),
            });
        }
    }
}

fn write_through(
    journal: &mut Journal,
    event: &Event,
    current: &[Shift],
    compact_threshold: u64,
) -> io::Result<()> {
    if let Event::Snapshot { .. } = event {
        return journal.rewrite(current);
    }
    journal.record(event, current)?;
    if journal.appends_since_compact() >= compact_threshold {
        journal.rewrite(current)?;
        metrics::counter!(COMPACTIONS_TOTAL).increment(1);
        tracing::info!(shifts = current.len(), "journal compacted");
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidTemplate("title is empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(StoreError::InvalidTemplate("title too long"));
    }
    Ok(())
}
