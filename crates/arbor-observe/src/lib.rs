//! Observation layer for the Arbor content repository API.
//!
//! Sessions publish the changes of every save as an event bundle through a
//! shared [`EventHub`]. Each session's [`ObservationManager`] dispatches the
//! bundles to its registered [`EventListener`]s, each filtered by its own
//! [`EventFilter`], and serves the optional [`EventJournal`] of past events.
//!
//! # Filtering
//!
//! | Restriction | Matches when |
//! |-------------|--------------|
//! | `event_types` | the event's type bit is in the mask |
//! | `abs_path` / `is_deep` | the associated parent node is at, or with `is_deep` below, `abs_path` |
//! | `identifiers` | the associated parent node's identifier is listed (`Some(empty)` matches nothing) |
//! | `node_type_names` | a primary or mixin type of the associated parent node is listed |
//! | `no_local` | the event was caused by another session |
//!
//! # Usage
//!
//! ```rust,ignore
//! use arbor_observe::{listener_fn, EventFilter, EventHub, LocalObservationManager, ObservationManager};
//!
//! let hub = EventHub::new();
//! let manager = LocalObservationManager::new(hub, SessionId::new(), "admin")?;
//! manager.add_event_listener(
//!     listener_fn(|events| for e in events { println!("{} {}", e.event_type, e.path) }),
//!     EventFilter::all().path(ItemPath::parse("/content")?, true),
//! )?;
//! ```

mod error;
mod event;
mod filter;
mod hub;
mod journal;
mod listener;
mod manager;
mod store;

pub use error::JournalError;
pub use event::{Event, EventBundle, EventIterator, PendingEvent, SessionId};
pub use filter::EventFilter;
pub use hub::EventHub;
pub use journal::{EventJournal, JournalStore, MemoryJournalStore};
pub use listener::{listener_fn, same_listener, EventListener, EventListenerIterator, FnListener};
pub use manager::{LocalObservationManager, ObservationManager};
pub use store::SqliteJournalStore;

#[cfg(test)]
mod tests;
