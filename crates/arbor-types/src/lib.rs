//! Shared types and error definitions for the Arbor content repository API.
//!
//! This crate provides the foundational types used across all Arbor crates:
//! the observation event kinds and their bitmask, validated absolute item
//! paths, typed property values, and the single repository-level error
//! (via `thiserror`) that every operation reports.
//!
//! No crate in the workspace depends on anything *except* `arbor-types` for
//! cross-cutting type definitions.

mod error;
mod event_type;
mod path;
mod range;
mod value;

pub use error::RepositoryError;
pub use event_type::{EventType, EventTypes, ParseEventTypeError};
pub use path::ItemPath;
pub use range::RangeIter;
pub use value::Value;

/// Convenience alias for results carrying a [`RepositoryError`].
pub type RepositoryResult<T> = Result<T, RepositoryError>;
