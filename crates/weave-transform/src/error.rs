//! Error types for transformations, sorting and application

use crate::transformer::TransformerId;
use std::fmt::{self, Display, Formatter};
use weave_tree::{Shape, TreeError};

/// Errors raised by transformation closures and builders
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Generic failure
    #[error("{0}")]
    Failed(String),

    /// Input node was not what the transformation expects
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Named source was never declared
    #[error("no source named '{0}'")]
    MissingSource(String),

    /// Builder is missing a required part
    #[error("transformation is missing its {0}")]
    MissingField(&'static str),

    /// Input node has the wrong shape
    #[error("expected a {expected}, found a {found}")]
    ShapeMismatch { expected: Shape, found: Shape },
}

/// Why two transformations cannot both be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Slices of one list that intersect without nesting
    Overlapping,
    /// Both replace exactly the same node or range
    Identical,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlapping => write!(f, "overlapping"),
            Self::Identical => write!(f, "identical"),
        }
    }
}

/// Errors from dependency sorting
///
/// Both variants are authoring conflicts and abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// Items depend on each other through strong edges only
    #[error("strong dependency cycle between {}", members.join(", "))]
    Cycle { members: Vec<String> },

    /// Two targets cannot be ordered at all
    #[error("{kind} targets: {first} and {second}")]
    Conflict {
        kind: ConflictKind,
        first: String,
        second: String,
    },
}

/// Errors applying a sorted batch to the tree
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Target or source no longer resolves
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Transformation closure failed
    #[error("transformation of {owner} failed: {source}")]
    Transform {
        owner: TransformerId,
        #[source]
        source: TransformError,
    },

    /// A slice replacement has to be a list of new elements
    #[error("{owner} replaced slice {target} with a {found}, expected a list")]
    ReplacementShape {
        owner: TransformerId,
        target: String,
        found: Shape,
    },

    /// Target or source addressed an element an earlier splice removed
    #[error("{owner} addresses {target}, which an earlier transformation removed")]
    RemovedTarget { owner: TransformerId, target: String },

    /// Transformation was built against an older tree
    #[error("{owner} built a transformation against generation {built}, tree is at {current}")]
    StaleTransformation {
        owner: TransformerId,
        built: u64,
        current: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_members() {
        let err = SortError::Cycle {
            members: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "strong dependency cycle between a, b");
    }

    #[test]
    fn conflict_message_names_both() {
        let err = SortError::Conflict {
            kind: ConflictKind::Identical,
            first: "x".into(),
            second: "y".into(),
        };
        assert_eq!(err.to_string(), "identical targets: x and y");
    }
}
