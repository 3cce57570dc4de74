//! Error types for tree access

use crate::codec::CodecError;
use crate::node::Shape;
use crate::path::{PathEntry, TreePath};

/// Errors resolving or writing tree paths
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The root list has no parent to be replaced in
    #[error("the root list cannot be replaced as a single node")]
    EmptyPath,

    /// Map key does not exist
    #[error("no node at {path}")]
    NotFound { path: TreePath },

    /// List index or range end past the end
    #[error("index {index} out of bounds at {path} (len {len})")]
    OutOfBounds {
        path: TreePath,
        index: usize,
        len: usize,
    },

    /// Path entry kind does not fit the node
    #[error("expected a {expected} at {path}, found a {found}")]
    ShapeMismatch {
        path: TreePath,
        expected: Shape,
        found: Shape,
    },

    /// Range start after its end
    #[error("invalid range {start}..{end} at {path}")]
    InvalidRange {
        path: TreePath,
        start: usize,
        end: usize,
    },

    /// Class could not be decoded
    #[error("class {index} failed to decode: {source}")]
    Codec {
        index: usize,
        #[source]
        source: CodecError,
    },
}

impl TreeError {
    /// Error for a missing child of a node with `shape` and `len` children
    ///
    /// `parent` is the path of the node that was searched.
    #[must_use]
    pub fn missing_child(parent: &TreePath, shape: Shape, len: usize, entry: &PathEntry) -> Self {
        match (shape, entry) {
            (Shape::List, PathEntry::Index(index)) => Self::OutOfBounds {
                path: parent.clone(),
                index: *index,
                len,
            },
            (Shape::Map, PathEntry::Key(_)) => Self::NotFound {
                path: parent.child(entry.clone()),
            },
            (found, PathEntry::Index(_)) => Self::ShapeMismatch {
                path: parent.clone(),
                expected: Shape::List,
                found,
            },
            (found, PathEntry::Key(_)) => Self::ShapeMismatch {
                path: parent.clone(),
                expected: Shape::Map,
                found,
            },
        }
    }
}
