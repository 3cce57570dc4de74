//! Engine error types

use crate::config::ConfigError;
use weave_transform::{ApplyError, SortError, TransformError, TransformerId, UnknownTransformer};
use weave_tree::{CodecError, TreeError};

/// Errors that abort [`crate::TransformationEngine::process`]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Two registered transformers share an id
    #[error("duplicate transformer id '{id}'")]
    DuplicateTransformer { id: TransformerId },

    /// An ordering declaration names an unregistered transformer
    #[error(transparent)]
    UnknownTransformer(#[from] UnknownTransformer),

    /// A transformer failed while producing its transformations
    #[error("transformer '{id}' failed: {source}")]
    Transformer {
        id: TransformerId,
        #[source]
        source: TransformError,
    },

    /// Round planning or transformation ordering failed
    #[error(transparent)]
    Sort(#[from] SortError),

    /// Applying an ordered batch failed
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Reading the tree failed outside of application
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Re-encoding a modified class failed
    #[error("cannot encode class '{class}': {source}")]
    Codec {
        class: String,
        #[source]
        source: CodecError,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether the error is an authoring conflict between transformers
    /// (overlapping or identical targets, strong cycles) rather than a
    /// failure of input or tree
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Sort(_) | Self::DuplicateTransformer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_transform::ConflictKind;

    #[test]
    fn sort_errors_are_conflicts() {
        let err = EngineError::from(SortError::Conflict {
            kind: ConflictKind::Overlapping,
            first: "a".into(),
            second: "b".into(),
        });
        assert!(err.is_conflict());
        assert!(err.to_string().contains("a"));
    }

    #[test]
    fn tree_errors_are_not_conflicts() {
        let err = EngineError::from(TreeError::EmptyPath);
        assert!(!err.is_conflict());
    }

    #[test]
    fn transformer_error_names_id() {
        let err = EngineError::Transformer {
            id: "widen".into(),
            source: TransformError::Failed("no fields".into()),
        };
        assert_eq!(err.to_string(), "transformer 'widen' failed: no fields");
    }
}
