//! Absolute repository paths.

use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

/// A validated absolute item path such as `/content/site/jcr:content`.
///
/// Paths always start with `/`, contain no empty segments and carry no
/// trailing slash (the root path `/` excepted). `.` and `..` segments are
/// rejected; callers must normalise before constructing a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemPath(String);

impl ItemPath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parses and validates an absolute path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if the path is relative, has
    /// empty segments, or uses `.`/`..` segments.
    pub fn parse(path: &str) -> Result<Self, RepositoryError> {
        if path == "/" {
            return Ok(Self::root());
        }
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| RepositoryError::InvalidPath(format!("{path}: not absolute")))?;
        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(RepositoryError::InvalidPath(format!(
                    "{path}: empty path segment"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(RepositoryError::InvalidPath(format!(
                    "{path}: relative segment '{segment}'"
                )));
            }
        }
        Ok(Self(path.to_string()))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<ItemPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Returns the last segment, or an empty string for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// Returns `true` if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &ItemPath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// Returns `true` if `self` equals `ancestor` or lies below it.
    pub fn is_same_or_descendant_of(&self, ancestor: &ItemPath) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }

    /// Appends a single segment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `segment` is empty or
    /// contains a `/`.
    pub fn join(&self, segment: &str) -> Result<ItemPath, RepositoryError> {
        if segment.is_empty() || segment.contains('/') {
            return Err(RepositoryError::InvalidPath(format!(
                "invalid path segment '{segment}'"
            )));
        }
        if self.is_root() {
            Self::parse(&format!("/{segment}"))
        } else {
            Self::parse(&format!("{}/{segment}", self.0))
        }
    }
}

impl std::fmt::Display for ItemPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ItemPath {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemPath {
    type Error = RepositoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemPath> for String {
    fn from(path: ItemPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ItemPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ItemPath {
        ItemPath::parse(s).unwrap()
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "a/b", "/a//b", "/a/", "/a/./b", "/a/../b"] {
            assert!(
                matches!(ItemPath::parse(bad), Err(RepositoryError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parent_and_name() {
        assert_eq!(p("/a/b/c").parent(), Some(p("/a/b")));
        assert_eq!(p("/a").parent(), Some(ItemPath::root()));
        assert_eq!(ItemPath::root().parent(), None);
        assert_eq!(p("/a/b/c").name(), "c");
        assert_eq!(ItemPath::root().name(), "");
        assert_eq!(p("/a/b/c").depth(), 3);
    }

    #[test]
    fn descendant_checks_respect_segment_boundaries() {
        assert!(p("/a/b").is_descendant_of(&p("/a")));
        assert!(!p("/ab").is_descendant_of(&p("/a")));
        assert!(!p("/a").is_descendant_of(&p("/a")));
        assert!(p("/a").is_same_or_descendant_of(&p("/a")));
        assert!(p("/a").is_descendant_of(&ItemPath::root()));
        assert!(!ItemPath::root().is_descendant_of(&ItemPath::root()));
    }

    #[test]
    fn join_appends_segments() {
        assert_eq!(ItemPath::root().join("a").unwrap(), p("/a"));
        assert_eq!(p("/a").join("b").unwrap(), p("/a/b"));
        assert!(p("/a").join("b/c").is_err());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: ItemPath = serde_json::from_str("\"/a/b\"").unwrap();
        assert_eq!(ok, p("/a/b"));
        assert!(serde_json::from_str::<ItemPath>("\"relative\"").is_err());
    }
}
