//! Event, bundle, and pending-change types.

use std::collections::BTreeMap;

use arbor_types::{EventType, ItemPath, RangeIter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies the session whose save produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocates a fresh random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A single repository change as seen by listeners and the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub event_type: EventType,
    /// Absolute path of the affected item. For `NODE_MOVED` this is the
    /// destination path. For `PERSIST` this is the root.
    pub path: ItemPath,
    /// Identifier of the affected node, or of the node owning the affected
    /// property.
    pub identifier: Option<String>,
    /// Identifier of the associated parent node.
    pub parent_identifier: Option<String>,
    /// Primary type followed by mixin types of the associated parent node.
    #[serde(default)]
    pub parent_node_types: Vec<String>,
    /// The user bound to the originating session.
    pub user_id: String,
    /// The originating session.
    pub session_id: SessionId,
    /// Opaque data set by the originating session via `set_user_data`.
    pub user_data: Option<String>,
    /// When the originating save happened.
    pub date: DateTime<Utc>,
    /// Additional information, e.g. `srcAbsPath`/`destAbsPath` for moves.
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

impl Event {
    /// Path of the associated parent node: the parent of the item at
    /// [`Event::path`]. The root is its own associated node.
    pub fn associated_path(&self) -> ItemPath {
        self.path.parent().unwrap_or_else(ItemPath::root)
    }
}

/// Events produced by one save of one session, in the order they occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBundle {
    /// Unique identifier of the save that produced the bundle.
    pub bundle_id: Uuid,
    /// The events, ending with a `PERSIST` marker.
    pub events: Vec<Event>,
}

/// A change recorded by a session before it is stamped and published.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub(crate) event_type: EventType,
    pub(crate) path: ItemPath,
    pub(crate) identifier: Option<String>,
    pub(crate) parent_identifier: Option<String>,
    pub(crate) parent_node_types: Vec<String>,
    pub(crate) info: BTreeMap<String, String>,
}

impl PendingEvent {
    /// Starts a change of the given kind at `path`.
    pub fn new(event_type: EventType, path: ItemPath) -> Self {
        Self {
            event_type,
            path,
            identifier: None,
            parent_identifier: None,
            parent_node_types: Vec::new(),
            info: BTreeMap::new(),
        }
    }

    /// Sets the identifier of the affected node.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the identifier of the associated parent node.
    pub fn parent_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.parent_identifier = Some(identifier.into());
        self
    }

    /// Sets the primary and mixin types of the associated parent node.
    pub fn parent_node_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_node_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an entry to the event's info map.
    pub fn info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Convenience constructor for a move, filling `srcAbsPath`/`destAbsPath`.
    pub fn moved(from: &ItemPath, to: ItemPath) -> Self {
        let dest = to.to_string();
        Self::new(EventType::NodeMoved, to)
            .info("srcAbsPath", from.as_str())
            .info("destAbsPath", dest)
    }
}

/// Origin stamped onto every event of a bundle.
#[derive(Debug, Clone)]
pub(crate) struct Origin {
    pub session_id: SessionId,
    pub user_id: String,
    pub user_data: Option<String>,
    pub date: DateTime<Utc>,
}

impl EventBundle {
    /// Stamps pending changes with their origin and closes the bundle with a
    /// `PERSIST` marker.
    pub(crate) fn stamp(changes: Vec<PendingEvent>, origin: Origin) -> Self {
        let stamp = |change: PendingEvent| Event {
            event_type: change.event_type,
            path: change.path,
            identifier: change.identifier,
            parent_identifier: change.parent_identifier,
            parent_node_types: change.parent_node_types,
            user_id: origin.user_id.clone(),
            session_id: origin.session_id,
            user_data: origin.user_data.clone(),
            date: origin.date,
            info: change.info,
        };

        let mut events: Vec<Event> = changes.into_iter().map(&stamp).collect();
        events.push(stamp(PendingEvent::new(EventType::Persist, ItemPath::root())));

        Self {
            bundle_id: Uuid::new_v4(),
            events,
        }
    }
}

/// The events handed to a listener for one bundle.
pub type EventIterator = RangeIter<Event>;
