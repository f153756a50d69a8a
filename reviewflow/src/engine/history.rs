//! Append-only record of applied events.

use serde::{Deserialize, Serialize};

use super::{Event, Stage, StageKind, Transition, TransitionEngine};
use crate::errors::TransitionError;
use crate::utils::{now_utc, Timestamp};

/// One applied event and the stage it left the instance in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the history, starting at 0.
    pub seq: u64,
    /// The applied event.
    pub event: Event,
    /// Stage kind after the event was applied.
    pub stage_after: StageKind,
    /// When the event was recorded.
    pub recorded_at: Timestamp,
}

/// Every event applied to one instance, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageHistory {
    entries: Vec<HistoryEntry>,
}

impl StageHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&mut self, event: Event, stage_after: StageKind) {
        let seq = self.entries.len() as u64;
        self.entries.push(HistoryEntry {
            seq,
            event,
            stage_after,
            recorded_at: now_utc(),
        });
    }

    /// Returns the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Iterates over the recorded events.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

/// Rebuilds the current stage by re-applying every recorded event.
///
/// Returns `None` for an empty history. Terminal transitions leave the
/// stage where it was, matching what the runner persists.
pub fn replay(engine: &TransitionEngine, history: &StageHistory) -> Result<Option<Stage>, TransitionError> {
    let mut events = history.events().cloned();
    let Some(first) = events.next() else {
        return Ok(None);
    };

    let mut stage = engine.start(first)?;
    for event in events {
        match engine.apply(&stage, event)? {
            Transition::Advance(next) => stage = next,
            Transition::Complete(_) | Transition::Fail(_) => {}
        }
    }
    Ok(Some(stage))
}
