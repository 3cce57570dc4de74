//! Tree paths
//!
//! Provides [`TreePath`] for addressing a node from the root list of classes.

use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a [`TreePath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathEntry {
    /// Position in a list
    Index(usize),
    /// Key in a map
    Key(String),
}

impl PathEntry {
    /// List index, if this entry is one
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(_) => None,
        }
    }

    /// Map key, if this entry is one
    #[inline]
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) => None,
        }
    }
}

impl Display for PathEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => write!(f, "{k}"),
        }
    }
}

impl From<usize> for PathEntry {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathEntry {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathEntry {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// Location of a node, starting at the root list of classes
///
/// The first entry of any non-root path is the class index.
///
/// # Examples
/// - `[]` is the root list
/// - `[3]` is the fourth class
/// - `[3, "fields", 1]` is the second field of that class (`3.fields.1`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TreePath(SmallVec<[PathEntry; 6]>);

impl TreePath {
    /// The root list
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Path of the class at `index` in the root list
    #[inline]
    #[must_use]
    pub fn class(index: usize) -> Self {
        let mut entries = SmallVec::new();
        entries.push(PathEntry::Index(index));
        Self(entries)
    }

    /// Build from entries
    #[inline]
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = PathEntry>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Append a map key, returning the new path
    #[inline]
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathEntry::Key(key.into()))
    }

    /// Append a list index, returning the new path
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathEntry::Index(index))
    }

    /// Append any entry, returning the new path
    #[inline]
    #[must_use]
    pub fn child(&self, entry: PathEntry) -> Self {
        let mut new = self.clone();
        new.0.push(entry);
        new
    }

    /// Path entries from root to leaf
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PathEntry] {
        &self.0
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Is this the root list
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Class index this path lives under
    #[inline]
    #[must_use]
    pub fn class_index(&self) -> Option<usize> {
        self.0.first().and_then(PathEntry::as_index)
    }

    /// Parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].iter().cloned().collect()))
        }
    }

    /// Last entry (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathEntry> {
        self.0.last()
    }

    /// Entry at `depth`
    #[inline]
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&PathEntry> {
        self.0.get(depth)
    }

    /// Check if `prefix` is a prefix of this path (equal paths included)
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Check if this path is strictly below `ancestor`
    #[inline]
    #[must_use]
    pub fn is_below(&self, ancestor: &Self) -> bool {
        self.0.len() > ancestor.0.len() && self.starts_with(ancestor)
    }

    /// Copy of this path with the index at `depth` moved by `delta`
    ///
    /// Returns `None` if the entry at `depth` is not an index or would go
    /// negative.
    #[must_use]
    pub fn with_index_shifted(&self, depth: usize, delta: isize) -> Option<Self> {
        let index = self.0.get(depth)?.as_index()?;
        let shifted = index.checked_add_signed(delta)?;
        let mut new = self.clone();
        new.0[depth] = PathEntry::Index(shifted);
        Some(new)
    }

    /// Iterator over entries
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.0.iter()
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    /// Parse `"3.fields.1"`. Numeric segments become list indices.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "<root>" {
            return Ok(Self::root());
        }

        s.split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if let Ok(index) = seg.parse::<usize>() {
                    Ok(PathEntry::Index(index))
                } else {
                    Ok(PathEntry::Key(seg.to_string()))
                }
            })
            .collect::<Result<SmallVec<_>, _>>()
            .map(Self)
    }
}

impl FromIterator<PathEntry> for TreePath {
    fn from_iter<I: IntoIterator<Item = PathEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors related to tree paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,
}
