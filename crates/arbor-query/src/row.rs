//! Result rows and the nodes they reference.

use std::sync::Arc;

use arbor_types::{ItemPath, RepositoryError, RepositoryResult, Value};
use serde::{Deserialize, Serialize};

/// A reference to a node matched by a query.
///
/// Storage is out of reach of a query result, so a node is represented by
/// the facts the executor captured when it produced the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    /// The node's identifier.
    pub identifier: String,
    /// The node's absolute path.
    pub path: ItemPath,
    /// The node's primary type, e.g. `nt:unstructured`.
    pub primary_type: String,
    /// The node's mixin types.
    #[serde(default)]
    pub mixin_types: Vec<String>,
}

/// A node selected by one selector of a row, with its full-text score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedNode {
    /// The matched node.
    pub node: NodeRef,
    /// The relevance score; `0.0` when the query did no full-text search.
    pub score: f64,
}

impl SelectedNode {
    /// Selects `node` with a zero score.
    pub fn new(node: NodeRef) -> Self {
        Self { node, score: 0.0 }
    }

    /// Selects `node` with the given score.
    pub fn scored(node: NodeRef, score: f64) -> Self {
        Self { node, score }
    }
}

/// Raw material for one row, as handed over by a query executor.
///
/// `values` align with the result's column names and `nodes` with its
/// selector names. A `None` node marks a selector left unmatched by an
/// outer join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    /// Column values in column order; `None` for a missing value.
    pub values: Vec<Option<Value>>,
    /// Selected nodes in selector order.
    pub nodes: Vec<Option<SelectedNode>>,
}

/// One row of a query result.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    selectors: Arc<[String]>,
    values: Vec<Option<Value>>,
    nodes: Vec<Option<SelectedNode>>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, selectors: Arc<[String]>, data: RowData) -> Self {
        Self {
            columns,
            selectors,
            values: data.values,
            nodes: data.nodes,
        }
    }

    /// All values of the row, in column order.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// The value of `column`, or `None` if the row has no value for it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownColumn` if `column` is not a column
    /// of the result.
    pub fn value(&self, column: &str) -> RepositoryResult<Option<&Value>> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| RepositoryError::UnknownColumn(column.to_string()))?;
        Ok(self.values.get(idx).and_then(Option::as_ref))
    }

    /// The node of the row's only selector.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::AmbiguousSelector` if the query had more
    /// than one selector.
    pub fn node(&self) -> RepositoryResult<Option<&NodeRef>> {
        Ok(self.only_selected()?.map(|s| &s.node))
    }

    /// The node selected by `selector`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownSelector` if `selector` does not
    /// belong to the query.
    pub fn node_for(&self, selector: &str) -> RepositoryResult<Option<&NodeRef>> {
        Ok(self.selected(selector)?.map(|s| &s.node))
    }

    /// Path of the node of the row's only selector.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::AmbiguousSelector` if the query had more
    /// than one selector.
    pub fn path(&self) -> RepositoryResult<Option<&ItemPath>> {
        Ok(self.node()?.map(|n| &n.path))
    }

    /// Path of the node selected by `selector`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownSelector` for a foreign selector.
    pub fn path_for(&self, selector: &str) -> RepositoryResult<Option<&ItemPath>> {
        Ok(self.node_for(selector)?.map(|n| &n.path))
    }

    /// Score of the row's only selector; `0.0` when unmatched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::AmbiguousSelector` if the query had more
    /// than one selector.
    pub fn score(&self) -> RepositoryResult<f64> {
        Ok(self.only_selected()?.map_or(0.0, |s| s.score))
    }

    /// Score for `selector`; `0.0` when unmatched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownSelector` for a foreign selector.
    pub fn score_for(&self, selector: &str) -> RepositoryResult<f64> {
        Ok(self.selected(selector)?.map_or(0.0, |s| s.score))
    }

    fn only_selected(&self) -> RepositoryResult<Option<&SelectedNode>> {
        match self.selectors.len() {
            0 => Ok(None),
            1 => Ok(self.nodes.first().and_then(Option::as_ref)),
            n => Err(RepositoryError::AmbiguousSelector(n)),
        }
    }

    fn selected(&self, selector: &str) -> RepositoryResult<Option<&SelectedNode>> {
        let idx = self
            .selectors
            .iter()
            .position(|s| s == selector)
            .ok_or_else(|| RepositoryError::UnknownSelector(selector.to_string()))?;
        Ok(self.nodes.get(idx).and_then(Option::as_ref))
    }

    pub(crate) fn into_only_node(self) -> Option<NodeRef> {
        self.nodes.into_iter().next().flatten().map(|s| s.node)
    }
}
