//! Query results for the Arbor content repository API.
//!
//! A [`QueryResult`] exposes its column and selector names any number of
//! times, but its rows only once, either as [`Row`]s or, for single-selector
//! queries, as the matched [`NodeRef`]s.

mod result;
mod row;

pub use result::{MaterializedResult, NodeIterator, QueryResult, RowIterator};
pub use row::{NodeRef, Row, RowData, SelectedNode};
