//! Arbor repository wiring.
//!
//! A [`Repository`] owns the [`EventHub`] shared by all of its sessions and,
//! when configured, the SQLite event journal behind it. Each [`Session`]
//! carries its own [`LocalObservationManager`] and publishes the changes of
//! every save through it.

pub mod config;

use std::sync::Arc;

use arbor_db::PoolError;
use arbor_observe::{
    EventFilter, EventHub, JournalStore, LocalObservationManager, PendingEvent, SessionId,
    SqliteJournalStore,
};
use arbor_types::{EventType, EventTypes, ItemPath, RepositoryError, RepositoryResult};
use thiserror::Error;

pub use arbor_observe as observation;
pub use arbor_query as query;

use crate::config::JournalConfig;

/// Errors raised while opening a repository.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The journal database could not be opened or migrated.
    #[error("failed to open event journal: {0}")]
    Journal(#[from] PoolError),
}

/// A content repository as seen by the observation layer.
#[derive(Clone)]
pub struct Repository {
    hub: EventHub,
}

impl Repository {
    /// Opens a repository with the journal described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `OpenError::Journal` if the journal is enabled but its
    /// database cannot be opened.
    pub fn open(config: &JournalConfig) -> Result<Self, OpenError> {
        if !config.enabled {
            tracing::info!("event journal disabled");
            return Ok(Self::without_journal());
        }

        let mut settings = config.runtime_settings();
        if config.path == ":memory:" {
            // Each pooled connection would see its own private database.
            settings.pool_max_size = 1;
        }
        let pool = arbor_db::open_journal_pool(&config.path, settings)?;
        Ok(Self::with_journal(Arc::new(SqliteJournalStore::new(pool))))
    }

    /// A repository whose sessions report the journal as unsupported.
    pub fn without_journal() -> Self {
        Self {
            hub: EventHub::new(),
        }
    }

    /// A repository journaling into `store`.
    pub fn with_journal(store: Arc<dyn JournalStore>) -> Self {
        Self {
            hub: EventHub::with_journal(store),
        }
    }

    /// Whether sessions of this repository can read an event journal.
    pub fn supports_journal(&self) -> bool {
        self.hub.supports_journal()
    }

    /// Starts a session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the session's event dispatcher
    /// cannot be started.
    pub fn login(&self, user_id: impl Into<String>) -> RepositoryResult<Session> {
        let user_id = user_id.into();
        let id = SessionId::new();
        let observation = LocalObservationManager::new(self.hub.clone(), id, user_id.clone())?;
        tracing::info!(session = %id, user = %user_id, "session started");
        Ok(Session {
            id,
            user_id,
            observation,
        })
    }
}

/// A user's session on a [`Repository`].
///
/// Dropping the session logs it out.
pub struct Session {
    id: SessionId,
    user_id: String,
    observation: LocalObservationManager,
}

impl Session {
    /// The session's identity as carried by the events it causes.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The user the session is bound to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The session's observation manager.
    pub fn observation_manager(&self) -> &LocalObservationManager {
        &self.observation
    }

    /// Persists `changes` as one save and notifies every interested
    /// listener of every session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Closed` after logout, or the journal's
    /// error if the save cannot be journaled.
    pub fn save(&self, changes: Vec<PendingEvent>) -> RepositoryResult<()> {
        let count = changes.len();
        self.observation.emit(changes)?;
        tracing::debug!(session = %self.id, events = count, "session saved");
        Ok(())
    }

    /// Ends the session, deregistering all of its listeners.
    pub fn logout(&self) {
        if !self.observation.is_closed() {
            self.observation.close();
            tracing::info!(session = %self.id, "session ended");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.logout();
    }
}

/// Builds a journal filter from the textual forms accepted on the command
/// line: an absolute path (matched deep) and a comma-separated list of event
/// type labels such as `NODE_ADDED,PERSIST`.
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` or `RepositoryError::InvalidFilter`
/// for unparsable input.
pub fn journal_filter(path: Option<&str>, types: Option<&str>) -> RepositoryResult<EventFilter> {
    let mut filter = EventFilter::all();
    if let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) {
        filter = filter.path(ItemPath::parse(path)?, true);
    }
    if let Some(types) = types.map(str::trim).filter(|t| !t.is_empty()) {
        let mask = types
            .split(',')
            .map(|label| label.trim().parse::<EventType>())
            .collect::<Result<EventTypes, _>>()
            .map_err(|e| RepositoryError::InvalidFilter(e.to_string()))?;
        filter = filter.event_types(mask);
    }
    filter.validate()?;
    Ok(filter)
}
