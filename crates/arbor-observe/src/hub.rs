//! Repository-wide event bus shared by every session.
//!
//! A save publishes one [`EventBundle`]. The hub journals it first (when a
//! journal store is configured) and only then fans it out to the dispatcher
//! of every live observation manager. Publication is serialised so journal
//! order and delivery order agree.

use std::sync::{Arc, Mutex};

use arbor_types::{RepositoryError, RepositoryResult};
use tokio::sync::mpsc;

use crate::event::{EventBundle, SessionId};
use crate::filter::EventFilter;
use crate::journal::{EventJournal, JournalStore};

type Subscriber = (u64, mpsc::UnboundedSender<Arc<EventBundle>>);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<Subscriber>,
}

/// Shared handle to the event bus. Clones refer to the same bus.
#[derive(Clone)]
pub struct EventHub {
    journal: Option<Arc<dyn JournalStore>>,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl EventHub {
    /// Creates a hub without journal support.
    pub fn new() -> Self {
        Self {
            journal: None,
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    /// Creates a hub that journals every published bundle in `store`.
    pub fn with_journal(store: Arc<dyn JournalStore>) -> Self {
        Self {
            journal: Some(store),
            ..Self::new()
        }
    }

    /// Whether this hub keeps an event journal.
    pub fn supports_journal(&self) -> bool {
        self.journal.is_some()
    }

    /// Registers a new live subscriber and returns its id and receiver.
    pub(crate) fn subscribe(
        &self,
    ) -> RepositoryResult<(u64, mpsc::UnboundedReceiver<Arc<EventBundle>>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subs = self.lock()?;
        let id = subs.next_id;
        subs.next_id += 1;
        subs.senders.push((id, tx));
        Ok((id, rx))
    }

    /// Drops a live subscriber; its receiver then drains and closes.
    pub(crate) fn unsubscribe(&self, id: u64) {
        match self.lock() {
            Ok(mut subs) => subs.senders.retain(|(sid, _)| *sid != id),
            Err(e) => tracing::warn!(subscriber = id, error = %e, "failed to unsubscribe from event hub"),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().map(|subs| subs.senders.len()).unwrap_or(0)
    }

    /// Journals `bundle` and delivers it to every live subscriber.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if journaling fails; the bundle is then not
    /// delivered to anyone.
    pub fn publish(&self, bundle: EventBundle) -> RepositoryResult<()> {
        let mut subs = self.lock()?;

        if let Some(ref journal) = self.journal {
            journal.append(&bundle)?;
        }

        let bundle = Arc::new(bundle);
        let before = subs.senders.len();
        subs.senders.retain(|(_, tx)| tx.send(Arc::clone(&bundle)).is_ok());
        let pruned = before - subs.senders.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned closed event hub subscribers");
        }

        tracing::trace!(
            bundle_id = %bundle.bundle_id,
            events = bundle.events.len(),
            subscribers = subs.senders.len(),
            "published event bundle"
        );
        Ok(())
    }

    /// Reads the journal, or `None` when the hub has no journal store.
    pub(crate) fn read_journal(
        &self,
        filter: &EventFilter,
        observer: SessionId,
    ) -> RepositoryResult<Option<EventJournal>> {
        match self.journal {
            Some(ref journal) => Ok(Some(EventJournal::new(journal.read(filter, observer)?))),
            None => Ok(None),
        }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Subscribers>> {
        self.subscribers
            .lock()
            .map_err(|_| RepositoryError::Backend("event hub lock poisoned".to_string()))
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
