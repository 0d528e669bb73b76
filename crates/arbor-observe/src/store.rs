//! SQLite persistence for the event journal.
//!
//! Every write goes through [`SqliteJournalStore::append`], which inserts
//! all events of a bundle inside one transaction so a bundle is either fully
//! journaled or not at all. Reads push the event-type mask down into SQL and
//! apply the remaining restrictions on the decoded events.

use arbor_db::DbPool;
use arbor_types::RepositoryResult;
use rusqlite::params;

use crate::error::JournalError;
use crate::event::{Event, EventBundle, SessionId};
use crate::filter::EventFilter;
use crate::journal::JournalStore;

/// Journal store backed by the `event_journal` table.
#[derive(Clone)]
pub struct SqliteJournalStore {
    pool: DbPool,
}

impl SqliteJournalStore {
    /// Wraps a pool whose database has the journal migrations applied.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn append_bundle(&self, bundle: &EventBundle) -> Result<(), JournalError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO event_journal
                    (bundle_id, event_type, path, parent_path, identifier, parent_identifier,
                     session_id, user_id, occurred_at_ms, payload_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for event in &bundle.events {
                let payload_json = serde_json::to_string(event)?;
                stmt.execute(params![
                    bundle.bundle_id.to_string(),
                    event.event_type.bit(),
                    event.path.as_str(),
                    event.associated_path().as_str(),
                    event.identifier,
                    event.parent_identifier,
                    event.session_id.to_string(),
                    event.user_id,
                    event.date.timestamp_millis(),
                    payload_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_events(
        &self,
        filter: &EventFilter,
        observer: SessionId,
    ) -> Result<Vec<Event>, JournalError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT payload_json FROM event_journal
             WHERE (event_type & ?1) != 0
             ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![filter.event_types.bits()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut events = Vec::new();
        for row in rows {
            let event: Event = serde_json::from_str(&row?)?;
            if filter.matches(&event, observer) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

impl JournalStore for SqliteJournalStore {
    fn append(&self, bundle: &EventBundle) -> RepositoryResult<()> {
        self.append_bundle(bundle).map_err(|e| {
            tracing::warn!(bundle_id = %bundle.bundle_id, error = %e, "failed to journal event bundle");
            e.into()
        })
    }

    fn read(&self, filter: &EventFilter, observer: SessionId) -> RepositoryResult<Vec<Event>> {
        Ok(self.read_events(filter, observer)?)
    }
}
