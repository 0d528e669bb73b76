//! Property values as they appear in query result rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::ItemPath;

/// A typed repository value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    /// A string value.
    String(String),
    /// A 64-bit signed integer.
    Long(i64),
    /// A double-precision float.
    Double(f64),
    /// A boolean.
    Boolean(bool),
    /// A point in time.
    Date(DateTime<Utc>),
    /// A qualified name such as `nt:unstructured`.
    Name(String),
    /// An absolute path.
    Path(ItemPath),
    /// The identifier of a referenced node.
    Reference(String),
}

impl Value {
    /// Returns the type label of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "STRING",
            Self::Long(_) => "LONG",
            Self::Double(_) => "DOUBLE",
            Self::Boolean(_) => "BOOLEAN",
            Self::Date(_) => "DATE",
            Self::Name(_) => "NAME",
            Self::Path(_) => "PATH",
            Self::Reference(_) => "REFERENCE",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) | Self::Name(s) | Self::Reference(s) => f.write_str(s),
            Self::Long(n) => write!(f, "{n}"),
            Self::Double(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => f.write_str(&d.to_rfc3339()),
            Self::Path(p) => f.write_str(p.as_str()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
