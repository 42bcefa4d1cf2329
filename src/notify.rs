use tokio::sync::broadcast;

use crate::model::{SeriesId, Shift, ShiftId};

const CHANNEL_CAPACITY: usize = 256;

/// What the store tells its subscribers (reminder scheduler, UI) after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftEvent {
    /// New shifts. `preview` holds the first instances only; `total` is the full count.
    Added {
        series_id: SeriesId,
        preview: Vec<Shift>,
        total: usize,
    },
    Updated {
        shift: Shift,
    },
    Removed {
        ids: Vec<ShiftId>,
    },
    /// The whole collection was swapped (import or reset).
    Replaced {
        count: usize,
    },
    /// A mutation is applied in memory but could not be written to disk yet.
    PersistenceFailed {
        message: String,
    },
}

/// Broadcast hub for store events.
pub struct NotifyHub {
    sender: broadcast::Sender<ShiftEvent>,
    preview: usize,
}

impl NotifyHub {
    pub fn new(preview: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, preview }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShiftEvent> {
        self.sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: ShiftEvent) {
        let _ = self.sender.send(event);
    }

    /// Announce a freshly added batch, trimmed to the preview window.
    pub fn added(&self, shifts: &[Shift]) {
        let Some(first) = shifts.first() else { return };
        self.send(ShiftEvent::Added {
            series_id: first.series_id.clone(),
            preview: shifts.iter().take(self.preview).cloned().collect(),
            total: shifts.len(),
        });
    }
}
