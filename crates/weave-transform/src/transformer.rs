//! Transformers: named producers of transformations
//!
//! A [`Transformer`] looks at the tree and returns the transformations it
//! wants applied. It may also declare ordering relative to other transformers,
//! either within one round or across rounds.

use crate::error::TransformError;
use crate::transformation::Transformation;
use std::borrow::Borrow;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use weave_tree::Tree;

/// Unique transformer name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransformerId(Arc<str>);

impl TransformerId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The id as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransformerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransformerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TransformerId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&TransformerId> for Arc<str> {
    fn from(id: &TransformerId) -> Self {
        Arc::clone(&id.0)
    }
}

impl Borrow<str> for TransformerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Producer of transformations
///
/// Declarations receive the ids of every registered transformer, so a
/// transformer can for example ask to run after all others.
pub trait Transformer: Send + Sync {
    /// Unique id
    fn id(&self) -> &TransformerId;

    /// Transformations to apply to the current tree
    ///
    /// # Errors
    /// Returns error if the transformer cannot make sense of the tree
    fn transform(&self, tree: &Tree) -> Result<Vec<Transformation>, TransformError>;

    /// Same-round transformers whose transformations must apply first
    fn must_run_after(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        Vec::new()
    }

    /// Same-round transformers whose transformations must apply later
    fn must_run_before(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        Vec::new()
    }

    /// Transformers that must run in an earlier round
    fn must_run_round_after(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        Vec::new()
    }

    /// Transformers that must run in a later round
    fn must_run_round_before(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        Vec::new()
    }
}

type TransformFn = dyn Fn(&Tree, &TransformerId) -> Result<Vec<Transformation>, TransformError>
    + Send
    + Sync;

/// Closure-backed [`Transformer`] with builder-style declarations
pub struct FnTransformer {
    id: TransformerId,
    transform: Box<TransformFn>,
    after: Vec<TransformerId>,
    before: Vec<TransformerId>,
    round_after: Vec<TransformerId>,
    round_before: Vec<TransformerId>,
}

impl FnTransformer {
    /// Transformer calling `f` with the tree and its own id
    pub fn new<F>(id: impl Into<TransformerId>, f: F) -> Self
    where
        F: Fn(&Tree, &TransformerId) -> Result<Vec<Transformation>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            transform: Box::new(f),
            after: Vec::new(),
            before: Vec::new(),
            round_after: Vec::new(),
            round_before: Vec::new(),
        }
    }

    /// Apply after `other` within the same round
    #[must_use]
    pub fn after(mut self, other: impl Into<TransformerId>) -> Self {
        self.after.push(other.into());
        self
    }

    /// Apply before `other` within the same round
    #[must_use]
    pub fn before(mut self, other: impl Into<TransformerId>) -> Self {
        self.before.push(other.into());
        self
    }

    /// Run in a round after the one `other` runs in
    #[must_use]
    pub fn round_after(mut self, other: impl Into<TransformerId>) -> Self {
        self.round_after.push(other.into());
        self
    }

    /// Run in a round before the one `other` runs in
    #[must_use]
    pub fn round_before(mut self, other: impl Into<TransformerId>) -> Self {
        self.round_before.push(other.into());
        self
    }
}

impl Transformer for FnTransformer {
    fn id(&self) -> &TransformerId {
        &self.id
    }

    fn transform(&self, tree: &Tree) -> Result<Vec<Transformation>, TransformError> {
        (self.transform)(tree, &self.id)
    }

    fn must_run_after(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        self.after.clone()
    }

    fn must_run_before(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        self.before.clone()
    }

    fn must_run_round_after(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        self.round_after.clone()
    }

    fn must_run_round_before(&self, _known: &[TransformerId]) -> Vec<TransformerId> {
        self.round_before.clone()
    }
}

impl Debug for FnTransformer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer")
            .field("id", &self.id)
            .field("after", &self.after)
            .field("before", &self.before)
            .field("round_after", &self.round_after)
            .field("round_before", &self.round_before)
            .finish_non_exhaustive()
    }
}
