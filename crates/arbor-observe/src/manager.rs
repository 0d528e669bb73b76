//! Listener registration and event dispatch for one session.
//!
//! Each [`LocalObservationManager`] owns a dispatcher thread fed by the
//! [`EventHub`]. For every bundle the dispatcher walks the registrations in
//! registration order, evaluates each listener's current filter and invokes
//! the listener with the matching events.
//!
//! # Locking
//!
//! Each registration has a state mutex guarding its filter and whether a
//! callback is running. The registration list lock is never held while a
//! state mutex is acquired; a state mutex may be held while the list is
//! locked (to detach a removed registration). Listener callbacks run with no
//! lock held, so they may call back into the manager.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};

use arbor_types::{RepositoryError, RepositoryResult};
use chrono::Utc;
use tokio::sync::mpsc;

use crate::event::{Event, EventBundle, EventIterator, Origin, PendingEvent, SessionId};
use crate::filter::EventFilter;
use crate::hub::EventHub;
use crate::journal::EventJournal;
use crate::listener::{same_listener, EventListener, EventListenerIterator};

/// Observation capability of a workspace session.
pub trait ObservationManager: Send + Sync {
    /// Registers `listener` with `filter`, or atomically replaces the filter
    /// if the same listener is already registered.
    ///
    /// The filter's path need not exist. A bundle is always evaluated
    /// against exactly one filter version, and a re-registered listener
    /// keeps receiving events throughout the change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidFilter` for an unusable filter and
    /// `RepositoryError::Closed` once the manager is closed.
    fn add_event_listener(
        &self,
        listener: Arc<dyn EventListener>,
        filter: EventFilter,
    ) -> RepositoryResult<()>;

    /// Deregisters `listener`.
    ///
    /// Blocks until a callback of `listener` running on another thread has
    /// returned. Called from inside the listener's own callback it returns
    /// at once and the removal takes effect when the callback returns. No
    /// callback starts once this call has begun. Removing a listener that
    /// is not registered does nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> RepositoryResult<()>;

    /// Returns the currently registered listeners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    fn registered_event_listeners(&self) -> RepositoryResult<EventListenerIterator>;

    /// Sets the data attached to events subsequently emitted by this
    /// session, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Closed` once the manager is closed.
    fn set_user_data(&self, user_data: Option<String>) -> RepositoryResult<()>;

    /// Returns the journaled events matching `filter`, or `None` if the
    /// repository keeps no journal.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for an unusable filter or a journal read
    /// failure.
    fn event_journal(&self, filter: &EventFilter) -> RepositoryResult<Option<EventJournal>>;
}

struct RegistrationState {
    filter: Arc<EventFilter>,
    running_on: Option<ThreadId>,
    removal_deferred: bool,
    detached: bool,
}

struct Registration {
    listener: Arc<dyn EventListener>,
    /// Set under `state` once removal starts; readable without it.
    removing: AtomicBool,
    state: Mutex<RegistrationState>,
    idle: Condvar,
}

impl Registration {
    fn new(listener: Arc<dyn EventListener>, filter: Arc<EventFilter>) -> Self {
        Self {
            listener,
            removing: AtomicBool::new(false),
            state: Mutex::new(RegistrationState {
                filter,
                running_on: None,
                removal_deferred: false,
                detached: false,
            }),
            idle: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Shared {
    session_id: SessionId,
    user_id: String,
    hub: EventHub,
    registrations: RwLock<Vec<Arc<Registration>>>,
    user_data: RwLock<Option<String>>,
    closed: AtomicBool,
}

impl Shared {
    fn snapshot(&self) -> Vec<Arc<Registration>> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes `reg` from the list. Called with `reg`'s state locked.
    fn detach(&self, reg: &Arc<Registration>) {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| !Arc::ptr_eq(r, reg));
    }

    fn deregister(&self, reg: &Arc<Registration>) {
        let me = thread::current().id();
        let mut state = reg.lock();
        reg.removing.store(true, Ordering::Release);

        if state.running_on == Some(me) {
            state.removal_deferred = true;
            tracing::debug!(session = %self.session_id, "listener removal deferred until its callback returns");
            return;
        }

        while state.running_on.is_some() {
            state = reg.idle.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        if !state.detached {
            self.detach(reg);
            state.detached = true;
            tracing::debug!(session = %self.session_id, "event listener removed");
        }
    }

    fn deliver(&self, bundle: &EventBundle) {
        let me = thread::current().id();

        for reg in self.snapshot() {
            let events: Vec<Event> = {
                let mut state = reg.lock();
                if reg.removing.load(Ordering::Acquire) {
                    continue;
                }
                let matching: Vec<Event> = bundle
                    .events
                    .iter()
                    .filter(|e| state.filter.matches(e, self.session_id))
                    .cloned()
                    .collect();
                if matching.is_empty() {
                    continue;
                }
                state.running_on = Some(me);
                matching
            };

            let delivered = events.len();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                reg.listener.on_event(EventIterator::new(events))
            }));
            if outcome.is_err() {
                tracing::error!(
                    session = %self.session_id,
                    bundle_id = %bundle.bundle_id,
                    events = delivered,
                    "event listener panicked; continuing dispatch"
                );
            }

            let mut state = reg.lock();
            state.running_on = None;
            if state.removal_deferred && !state.detached {
                self.detach(&reg);
                state.detached = true;
                tracing::debug!(session = %self.session_id, "event listener removed after its callback");
            }
            reg.idle.notify_all();
        }
    }
}

fn run_dispatcher(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Arc<EventBundle>>) {
    while let Some(bundle) = rx.blocking_recv() {
        if shared.closed.load(Ordering::Acquire) {
            break;
        }
        shared.deliver(&bundle);
    }
    tracing::debug!(session = %shared.session_id, "event dispatcher stopped");
}

/// In-process [`ObservationManager`] bound to one session and one hub.
///
/// Dropping the manager closes it: the dispatcher stops and every listener
/// is deregistered.
pub struct LocalObservationManager {
    shared: Arc<Shared>,
    subscription: u64,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl LocalObservationManager {
    /// Creates a manager for the session `session_id` of `user_id` and
    /// starts its dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the dispatcher thread cannot be
    /// started or the hub is unusable.
    pub fn new(hub: EventHub, session_id: SessionId, user_id: impl Into<String>) -> RepositoryResult<Self> {
        let (subscription, rx) = hub.subscribe()?;
        let shared = Arc::new(Shared {
            session_id,
            user_id: user_id.into(),
            hub,
            registrations: RwLock::new(Vec::new()),
            user_data: RwLock::new(None),
            closed: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("arbor-dispatch-{session_id}"))
            .spawn(move || run_dispatcher(worker, rx))
            .map_err(|e| {
                shared.hub.unsubscribe(subscription);
                RepositoryError::Backend(format!("failed to start event dispatcher: {e}"))
            })?;

        tracing::debug!(session = %session_id, "observation manager started");

        Ok(Self {
            shared,
            subscription,
            dispatcher: Mutex::new(Some(handle)),
        })
    }

    /// The session this manager observes for.
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// The user bound to the session.
    pub fn user_id(&self) -> &str {
        &self.shared.user_id
    }

    /// Current user data stamped onto emitted events.
    pub fn user_data(&self) -> Option<String> {
        self.shared
            .user_data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes the changes of one save of this session.
    ///
    /// Events are stamped with the session, user, current user data and
    /// the save time; a `PERSIST` marker closes the bundle. An empty change
    /// list publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Closed` once closed, or the journal's error
    /// if the bundle cannot be journaled (nothing is delivered then).
    pub fn emit(&self, changes: Vec<PendingEvent>) -> RepositoryResult<()> {
        self.ensure_open()?;
        if changes.is_empty() {
            return Ok(());
        }
        let origin = Origin {
            session_id: self.shared.session_id,
            user_id: self.shared.user_id.clone(),
            user_data: self.user_data(),
            date: Utc::now(),
        };
        self.shared.hub.publish(EventBundle::stamp(changes, origin))
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stops dispatch and deregisters every listener.
    ///
    /// Blocks until running callbacks return, unless called from inside a
    /// callback of this manager.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.hub.unsubscribe(self.subscription);

        for reg in self.shared.snapshot() {
            self.shared.deregister(&reg);
        }

        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!(session = %self.shared.session_id, "event dispatcher exited with a panic");
            }
        }

        tracing::debug!(session = %self.shared.session_id, "observation manager closed");
    }

    fn ensure_open(&self) -> RepositoryResult<()> {
        if self.is_closed() {
            Err(RepositoryError::Closed("observation manager"))
        } else {
            Ok(())
        }
    }
}

impl ObservationManager for LocalObservationManager {
    fn add_event_listener(
        &self,
        listener: Arc<dyn EventListener>,
        filter: EventFilter,
    ) -> RepositoryResult<()> {
        self.ensure_open()?;
        filter.validate()?;
        let filter = Arc::new(filter);

        let existing = {
            let mut regs = self
                .shared
                .registrations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let found = regs
                .iter()
                .find(|r| !r.removing.load(Ordering::Acquire) && same_listener(&r.listener, &listener))
                .cloned();
            if found.is_none() {
                regs.push(Arc::new(Registration::new(listener, Arc::clone(&filter))));
            }
            found
        };

        match existing {
            Some(reg) => {
                reg.lock().filter = filter;
                tracing::debug!(session = %self.shared.session_id, "event listener filter replaced");
            }
            None => {
                tracing::debug!(
                    session = %self.shared.session_id,
                    path = %filter.abs_path,
                    deep = filter.is_deep,
                    types = filter.event_types.bits(),
                    "event listener registered"
                );
            }
        }
        Ok(())
    }

    fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> RepositoryResult<()> {
        let matching: Vec<Arc<Registration>> = self
            .shared
            .snapshot()
            .into_iter()
            .filter(|r| same_listener(&r.listener, listener))
            .collect();

        if matching.is_empty() {
            tracing::debug!(session = %self.shared.session_id, "ignoring removal of unregistered listener");
            return Ok(());
        }

        for reg in &matching {
            self.shared.deregister(reg);
        }
        Ok(())
    }

    fn registered_event_listeners(&self) -> RepositoryResult<EventListenerIterator> {
        let mut listeners: Vec<Arc<dyn EventListener>> = Vec::new();
        for reg in self.shared.snapshot() {
            if !listeners.iter().any(|l| same_listener(l, &reg.listener)) {
                listeners.push(Arc::clone(&reg.listener));
            }
        }
        Ok(EventListenerIterator::new(listeners))
    }

    fn set_user_data(&self, user_data: Option<String>) -> RepositoryResult<()> {
        self.ensure_open()?;
        *self
            .shared
            .user_data
            .write()
            .unwrap_or_else(PoisonError::into_inner) = user_data;
        Ok(())
    }

    fn event_journal(&self, filter: &EventFilter) -> RepositoryResult<Option<EventJournal>> {
        self.ensure_open()?;
        filter.validate()?;
        self.shared.hub.read_journal(filter, self.shared.session_id)
    }
}

impl Drop for LocalObservationManager {
    fn drop(&mut self) {
        self.close();
    }
}
