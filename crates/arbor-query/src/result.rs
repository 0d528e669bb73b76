//! One-shot query results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arbor_types::{RangeIter, RepositoryError, RepositoryResult};

use crate::row::{NodeRef, Row, RowData};

/// Iterator over the rows of a result.
pub type RowIterator = RangeIter<Row>;

/// Iterator over the nodes of a single-selector result.
pub type NodeIterator = RangeIter<NodeRef>;

/// The result of executing a query.
///
/// Rows and nodes can be retrieved once: whichever of [`rows`](Self::rows)
/// or [`nodes`](Self::nodes) is called first consumes the result, and every
/// later call to either fails with `RepositoryError::ResultConsumed`. Column
/// and selector names stay available.
pub trait QueryResult: Send + Sync {
    /// Column names in result order. May be empty.
    fn column_names(&self) -> RepositoryResult<Vec<String>>;

    /// Selector names in query order. Empty if the query names none.
    fn selector_names(&self) -> RepositoryResult<Vec<String>>;

    /// Consumes the result as rows.
    fn rows(&self) -> RepositoryResult<RowIterator>;

    /// Consumes the result as the nodes of its only selector.
    ///
    /// Fails with `RepositoryError::AmbiguousSelector` when the query has
    /// more than one selector; that failure does not consume the result.
    fn nodes(&self) -> RepositoryResult<NodeIterator>;
}

/// A [`QueryResult`] whose rows were fully produced before it was handed out.
#[derive(Debug)]
pub struct MaterializedResult {
    columns: Arc<[String]>,
    selectors: Arc<[String]>,
    rows: Mutex<Option<Vec<Row>>>,
    consumed: AtomicBool,
}

impl MaterializedResult {
    /// Builds a result from executor output.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if a row's values do not line up
    /// with `columns` or its nodes with `selectors`.
    pub fn new(
        columns: Vec<String>,
        selectors: Vec<String>,
        rows: Vec<RowData>,
    ) -> RepositoryResult<Self> {
        let columns: Arc<[String]> = columns.into();
        let selectors: Arc<[String]> = selectors.into();

        for (i, row) in rows.iter().enumerate() {
            if row.values.len() != columns.len() {
                return Err(RepositoryError::Backend(format!(
                    "row {i} has {} values for {} columns",
                    row.values.len(),
                    columns.len()
                )));
            }
            if row.nodes.len() != selectors.len() {
                return Err(RepositoryError::Backend(format!(
                    "row {i} has {} nodes for {} selectors",
                    row.nodes.len(),
                    selectors.len()
                )));
            }
        }

        let rows = rows
            .into_iter()
            .map(|data| Row::new(Arc::clone(&columns), Arc::clone(&selectors), data))
            .collect();

        Ok(Self {
            columns,
            selectors,
            rows: Mutex::new(Some(rows)),
            consumed: AtomicBool::new(false),
        })
    }

    /// Whether rows or nodes have already been taken.
    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    fn take(&self, accessor: &'static str) -> RepositoryResult<Vec<Row>> {
        if self
            .consumed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(accessor, "query result already consumed");
            return Err(RepositoryError::ResultConsumed);
        }
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        Ok(rows)
    }
}

impl QueryResult for MaterializedResult {
    fn column_names(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.columns.to_vec())
    }

    fn selector_names(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.selectors.to_vec())
    }

    fn rows(&self) -> RepositoryResult<RowIterator> {
        self.take("rows").map(RangeIter::new)
    }

    fn nodes(&self) -> RepositoryResult<NodeIterator> {
        if self.selectors.len() > 1 {
            return Err(RepositoryError::AmbiguousSelector(self.selectors.len()));
        }
        let nodes: Vec<NodeRef> = self
            .take("nodes")?
            .into_iter()
            .filter_map(Row::into_only_node)
            .collect();
        Ok(RangeIter::new(nodes))
    }
}
