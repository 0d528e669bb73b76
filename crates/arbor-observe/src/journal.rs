//! The event journal: a queryable, ordered log of past events.

use std::sync::RwLock;

use arbor_types::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};

use crate::event::{Event, EventBundle, SessionId};
use crate::filter::EventFilter;

/// Backing storage for the event journal.
///
/// A hub without a journal store reports the journal as unsupported; a
/// store that holds no events yields an empty [`EventJournal`].
pub trait JournalStore: Send + Sync {
    /// Appends every event of a bundle, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the bundle cannot be persisted; no
    /// event of the bundle is then recorded.
    fn append(&self, bundle: &EventBundle) -> RepositoryResult<()>;

    /// Returns recorded events matching `filter` on behalf of `observer`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    fn read(&self, filter: &EventFilter, observer: SessionId) -> RepositoryResult<Vec<Event>>;
}

/// A journal store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryJournalStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryJournalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl JournalStore for MemoryJournalStore {
    fn append(&self, bundle: &EventBundle) -> RepositoryResult<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| RepositoryError::Backend("memory journal lock poisoned".to_string()))?;
        events.extend(bundle.events.iter().cloned());
        Ok(())
    }

    fn read(&self, filter: &EventFilter, observer: SessionId) -> RepositoryResult<Vec<Event>> {
        let events = self
            .events
            .read()
            .map_err(|_| RepositoryError::Backend("memory journal lock poisoned".to_string()))?;
        Ok(events
            .iter()
            .filter(|e| filter.matches(e, observer))
            .cloned()
            .collect())
    }
}

/// A read-only, ordered view over journaled events.
#[derive(Debug)]
pub struct EventJournal {
    events: Vec<Event>,
    position: usize,
}

impl EventJournal {
    pub(crate) fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            position: 0,
        }
    }

    /// Total number of events in the journal view.
    pub fn size(&self) -> usize {
        self.events.len()
    }

    /// Number of events already returned or skipped.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns `true` if the view holds no events at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Skips every remaining event that happened strictly before `date`.
    ///
    /// Events are ordered by save order, so this stops at the first event
    /// dated at or after `date`.
    pub fn skip_to(&mut self, date: DateTime<Utc>) {
        while let Some(event) = self.events.get(self.position) {
            if event.date >= date {
                break;
            }
            self.position += 1;
        }
    }
}

impl Iterator for EventJournal {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let event = self.events.get(self.position)?.clone();
        self.position += 1;
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.events.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EventJournal {}
