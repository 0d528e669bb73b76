//! Observation event kinds and the bitmask used to select them.

use serde::{Deserialize, Serialize};

/// A single kind of repository change.
///
/// The discriminants are the bit values used in [`EventTypes`] masks and
/// in the persisted journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum EventType {
    /// A node was added.
    NodeAdded = 0x1,
    /// A node was removed.
    NodeRemoved = 0x2,
    /// A property was added.
    PropertyAdded = 0x4,
    /// A property was removed.
    PropertyRemoved = 0x8,
    /// The value of a property changed.
    PropertyChanged = 0x10,
    /// A node was moved (or renamed, or reordered).
    NodeMoved = 0x20,
    /// A save completed; closes an event bundle in the journal.
    Persist = 0x40,
}

impl EventType {
    /// Every event type, in bit order.
    pub const VALUES: [EventType; 7] = [
        Self::NodeAdded,
        Self::NodeRemoved,
        Self::PropertyAdded,
        Self::PropertyRemoved,
        Self::PropertyChanged,
        Self::NodeMoved,
        Self::Persist,
    ];

    /// Returns the bit value of this event type.
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Converts a single bit value back into an event type.
    pub fn from_bit(bit: u32) -> Option<Self> {
        Self::VALUES.into_iter().find(|t| t.bit() == bit)
    }

    /// Returns the canonical string label for this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeAdded => "NODE_ADDED",
            Self::NodeRemoved => "NODE_REMOVED",
            Self::PropertyAdded => "PROPERTY_ADDED",
            Self::PropertyRemoved => "PROPERTY_REMOVED",
            Self::PropertyChanged => "PROPERTY_CHANGED",
            Self::NodeMoved => "NODE_MOVED",
            Self::Persist => "PERSIST",
        }
    }

    /// Whether this event describes a property rather than a node.
    pub fn is_property_event(self) -> bool {
        matches!(
            self,
            Self::PropertyAdded | Self::PropertyRemoved | Self::PropertyChanged
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VALUES
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEventTypeError(s.to_string()))
    }
}

/// Error returned when parsing an unknown event type label.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct ParseEventTypeError(pub String);

/// A set of [`EventType`]s encoded as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTypes(u32);

impl EventTypes {
    /// The empty mask. Never valid as a listener filter.
    pub const NONE: EventTypes = EventTypes(0);

    /// Every defined event type.
    pub const ALL: EventTypes = EventTypes(0x7f);

    /// Builds a mask from raw bits, rejecting bits with no defined event type.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Returns the raw bitmask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if no event type is selected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `event_type` is selected by this mask.
    pub fn contains(self, event_type: EventType) -> bool {
        self.0 & event_type.bit() != 0
    }

    /// Returns the union of two masks.
    pub fn union(self, other: EventTypes) -> EventTypes {
        Self(self.0 | other.0)
    }

    /// Iterates the selected event types in bit order.
    pub fn iter(self) -> impl Iterator<Item = EventType> {
        EventType::VALUES
            .into_iter()
            .filter(move |t| self.contains(*t))
    }
}

impl From<EventType> for EventTypes {
    fn from(event_type: EventType) -> Self {
        Self(event_type.bit())
    }
}

impl std::ops::BitOr for EventType {
    type Output = EventTypes;

    fn bitor(self, rhs: EventType) -> EventTypes {
        EventTypes(self.bit() | rhs.bit())
    }
}

impl std::ops::BitOr<EventType> for EventTypes {
    type Output = EventTypes;

    fn bitor(self, rhs: EventType) -> EventTypes {
        EventTypes(self.0 | rhs.bit())
    }
}

impl std::ops::BitOr for EventTypes {
    type Output = EventTypes;

    fn bitor(self, rhs: EventTypes) -> EventTypes {
        self.union(rhs)
    }
}

impl FromIterator<EventType> for EventTypes {
    fn from_iter<I: IntoIterator<Item = EventType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(EventTypes::NONE, |mask, t| mask | t)
    }
}
