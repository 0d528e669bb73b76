//! Filter criteria shared by live listeners and the event journal.
//!
//! Every restriction present on an [`EventFilter`] must hold for an event to
//! match. Path, identifier and node-type restrictions apply to the event's
//! *associated parent node* (see [`Event::associated_path`]). `PERSIST`
//! markers have no associated node: they pass any path restriction and fail
//! any identifier or node-type restriction.

use std::collections::BTreeSet;

use arbor_types::{EventType, EventTypes, ItemPath, RepositoryError};

use crate::event::{Event, SessionId};

/// Filter criteria for listener registration and journal queries.
///
/// `identifiers` and `node_type_names` distinguish *unset* (`None`, no
/// restriction) from *empty* (`Some` of an empty set, matches nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Event kinds to accept. Must not be empty.
    pub event_types: EventTypes,
    /// Path of the associated parent node to match. The node need not exist.
    pub abs_path: ItemPath,
    /// Also match associated parent nodes anywhere below `abs_path`.
    pub is_deep: bool,
    /// Identifiers of the associated parent node to accept.
    pub identifiers: Option<BTreeSet<String>>,
    /// Primary or mixin type names of the associated parent node to accept.
    pub node_type_names: Option<BTreeSet<String>>,
    /// Drop events caused by the session that applies the filter.
    pub no_local: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl EventFilter {
    /// Matches every event anywhere in the workspace.
    pub fn all() -> Self {
        Self {
            event_types: EventTypes::ALL,
            abs_path: ItemPath::root(),
            is_deep: true,
            identifiers: None,
            node_type_names: None,
            no_local: false,
        }
    }

    /// Restricts to the given event kinds.
    pub fn event_types(mut self, event_types: impl Into<EventTypes>) -> Self {
        self.event_types = event_types.into();
        self
    }

    /// Restricts to associated parent nodes at `abs_path`, or below it when
    /// `is_deep` is set.
    pub fn path(mut self, abs_path: ItemPath, is_deep: bool) -> Self {
        self.abs_path = abs_path;
        self.is_deep = is_deep;
        self
    }

    /// Restricts to associated parent nodes with one of `identifiers`.
    /// An empty collection matches nothing.
    pub fn identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = Some(identifiers.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to associated parent nodes carrying one of `names` as
    /// primary or mixin type. An empty collection matches nothing.
    pub fn node_type_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_type_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Suppresses events caused by the filtering session itself.
    pub fn no_local(mut self, no_local: bool) -> Self {
        self.no_local = no_local;
        self
    }

    /// Checks the filter is usable for registration or a journal query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidFilter` for an empty event-type mask
    /// or bits that name no event type.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.event_types.is_empty() {
            return Err(RepositoryError::InvalidFilter(
                "event type mask is empty".to_string(),
            ));
        }
        if EventTypes::from_bits(self.event_types.bits()).is_none() {
            return Err(RepositoryError::InvalidFilter(format!(
                "event type mask {:#x} has undefined bits",
                self.event_types.bits()
            )));
        }
        Ok(())
    }

    /// Returns `true` if `event` passes every restriction, evaluated on
    /// behalf of the session `observer`.
    pub fn matches(&self, event: &Event, observer: SessionId) -> bool {
        if !self.event_types.contains(event.event_type) {
            return false;
        }
        if self.no_local && event.session_id == observer {
            return false;
        }
        if event.event_type != EventType::Persist {
            let associated = event.associated_path();
            let path_ok = if self.is_deep {
                associated.is_same_or_descendant_of(&self.abs_path)
            } else {
                associated == self.abs_path
            };
            if !path_ok {
                return false;
            }
        }

        if let Some(ref identifiers) = self.identifiers {
            match event.parent_identifier {
                Some(ref id) if identifiers.contains(id) => {}
                _ => return false,
            }
        }

        if let Some(ref names) = self.node_type_names {
            if !event.parent_node_types.iter().any(|t| names.contains(t)) {
                return false;
            }
        }

        true
    }
}
