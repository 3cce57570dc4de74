//! One patch against the tree
//!
//! A [`Transformation`] names one [`Target`] to replace, any number of named
//! read-only source targets, and a pure function computing the replacement.

use crate::error::TransformError;
use crate::target::{Shift, Target};
use crate::transformer::TransformerId;
use indexmap::IndexMap;
use std::fmt::{self, Debug, Display, Formatter};
use weave_tree::{Node, NodeHandle, Tree, TreePath};

/// Replacement function: `(target node, sources) -> replacement`
///
/// For a slice target the input is a list of the addressed elements and the
/// output must be the list of elements to put in their place.
pub type ApplyFn =
    Box<dyn FnOnce(NodeHandle, Sources) -> Result<NodeHandle, TransformError> + Send>;

/// Resolved source nodes handed to an [`ApplyFn`], in declaration order
#[derive(Debug, Clone, Default)]
pub struct Sources(IndexMap<String, NodeHandle>);

impl Sources {
    /// Wrap resolved nodes
    #[inline]
    #[must_use]
    pub fn new(nodes: IndexMap<String, NodeHandle>) -> Self {
        Self(nodes)
    }

    /// Source by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NodeHandle> {
        self.0.get(name)
    }

    /// Source by name, failing the transformation if absent
    ///
    /// # Errors
    /// Returns [`TransformError::MissingSource`] if no source has that name
    pub fn require(&self, name: &str) -> Result<&NodeHandle, TransformError> {
        self.get(name)
            .ok_or_else(|| TransformError::MissingSource(name.to_string()))
    }

    /// Sources in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeHandle)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No sources
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Patch produced by a transformer
///
/// # Invariants
/// - `generation` is the tree generation the targets were computed against
/// - only the applier rewrites `target` and `sources`
pub struct Transformation {
    owner: TransformerId,
    target: Target,
    sources: IndexMap<String, Target>,
    apply: ApplyFn,
    description: String,
    generation: u64,
    invalidated: Option<Target>,
}

impl Transformation {
    /// Start building a transformation for `owner`
    #[inline]
    #[must_use]
    pub fn builder(owner: &TransformerId) -> TransformationBuilder {
        TransformationBuilder::new().owner(owner.clone())
    }

    /// Producing transformer
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &TransformerId {
        &self.owner
    }

    /// What is replaced
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Named read-only inputs
    #[inline]
    #[must_use]
    pub fn sources(&self) -> &IndexMap<String, Target> {
        &self.sources
    }

    /// Human-readable description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Tree generation the targets refer to
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Renumber target and sources after a splice, returning how many moved
    pub fn shift_for_splice(
        &mut self,
        list: &TreePath,
        start: usize,
        end: usize,
        delta: isize,
    ) -> usize {
        let mut moved = 0;
        for target in std::iter::once(&mut self.target).chain(self.sources.values_mut()) {
            match target.shift_for_splice(list, start, end, delta) {
                Shift::Unchanged => {}
                Shift::Shifted => moved += 1,
                Shift::Invalidated => {
                    if self.invalidated.is_none() {
                        self.invalidated = Some(target.clone());
                    }
                }
            }
        }
        moved
    }

    /// First target or source whose element an earlier splice removed
    #[inline]
    #[must_use]
    pub fn invalidated(&self) -> Option<&Target> {
        self.invalidated.as_ref()
    }

    pub(crate) fn into_parts(self) -> (TransformerId, Target, IndexMap<String, Target>, ApplyFn) {
        (self.owner, self.target, self.sources, self.apply)
    }
}

impl Display for Transformation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} at {})", self.owner, self.description, self.target)
    }
}

impl Debug for Transformation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("owner", &self.owner)
            .field("target", &self.target)
            .field("sources", &self.sources)
            .field("description", &self.description)
            .field("generation", &self.generation)
            .field("invalidated", &self.invalidated)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Transformation`]
#[derive(Default)]
pub struct TransformationBuilder {
    owner: Option<TransformerId>,
    target: Option<Target>,
    sources: IndexMap<String, Target>,
    apply: Option<ApplyFn>,
    description: Option<String>,
    generation: Option<u64>,
}

impl TransformationBuilder {
    /// Create new builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set owning transformer
    #[inline]
    #[must_use]
    pub fn owner(mut self, owner: TransformerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set target
    #[inline]
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Add a named source; a later source with the same name replaces it
    #[inline]
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, target: Target) -> Self {
        self.sources.insert(name.into(), target);
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Bind to the current generation of `tree`
    #[inline]
    #[must_use]
    pub fn against(self, tree: &Tree) -> Self {
        self.generation(tree.generation())
    }

    /// Bind to an explicit tree generation
    #[inline]
    #[must_use]
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Set the replacement function
    #[must_use]
    pub fn apply<F>(mut self, f: F) -> Self
    where
        F: FnOnce(NodeHandle, Sources) -> Result<NodeHandle, TransformError> + Send + 'static,
    {
        self.apply = Some(Box::new(f));
        self
    }

    /// Replace the target with a fixed node, ignoring its current value
    #[must_use]
    pub fn replace_with(self, node: Node) -> Self {
        self.apply(move |_, _| Ok(NodeHandle::new(node)))
    }

    /// Build the transformation
    ///
    /// # Errors
    /// Returns error if the owner, target, generation or function is missing
    pub fn build(self) -> Result<Transformation, TransformError> {
        let owner = self.owner.ok_or(TransformError::MissingField("owner"))?;
        let target = self.target.ok_or(TransformError::MissingField("target"))?;
        let apply = self.apply.ok_or(TransformError::MissingField("function"))?;
        let generation = self
            .generation
            .ok_or(TransformError::MissingField("generation"))?;
        let description = self
            .description
            .unwrap_or_else(|| format!("replace {target}"));

        Ok(Transformation {
            owner,
            target,
            sources: self.sources,
            apply,
            description,
            generation,
            invalidated: None,
        })
    }
}

impl Debug for TransformationBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationBuilder")
            .field("owner", &self.owner)
            .field("target", &self.target)
            .field("generation", &self.generation)
            .field("has_apply", &self.apply.is_some())
            .finish_non_exhaustive()
    }
}
