//! Applies a sorted batch of transformations to the tree
//!
//! Transformations run one at a time against the live tree. Whenever a slice
//! replacement changes the length of a list, every transformation still
//! pending in the batch is renumbered so its target and sources keep
//! addressing the same elements.

use crate::error::ApplyError;
use crate::target::Target;
use crate::transformation::{Sources, Transformation};
use crate::transformer::TransformerId;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use weave_tree::{Node, NodeHandle, Tree};

/// Outcome of one applied batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Transformations applied
    pub applied: usize,
    /// Sum of element-count changes of slice replacements
    pub element_delta: isize,
    /// Targets and sources renumbered along the way
    pub shifted_targets: usize,
}

/// Apply `batch` in order
///
/// Every transformation must have been built against the tree's current
/// generation.
///
/// # Errors
/// Returns error on stale transformations, unresolvable targets, targets or
/// sources whose element an earlier splice removed, failing closures, or
/// slice replacements that are not lists. The tree may be partially
/// modified when an error is returned.
pub fn apply_batch(tree: &mut Tree, batch: Vec<Transformation>) -> Result<ApplyReport, ApplyError> {
    let current = tree.generation();
    if let Some(stale) = batch.iter().find(|t| t.generation() != current) {
        return Err(ApplyError::StaleTransformation {
            owner: stale.owner().clone(),
            built: stale.generation(),
            current,
        });
    }

    let mut pending: VecDeque<Transformation> = batch.into();
    let mut report = ApplyReport::default();

    while let Some(transformation) = pending.pop_front() {
        tracing::debug!(%transformation, "applying");
        if let Some(removed) = transformation.invalidated() {
            return Err(ApplyError::RemovedTarget {
                owner: transformation.owner().clone(),
                target: removed.to_string(),
            });
        }
        let (owner, target, sources, apply) = transformation.into_parts();

        let input = resolve(tree, &target)?;
        let sources = resolve_sources(tree, &sources)?;
        let mut replacement = apply(input, sources).map_err(|source| ApplyError::Transform {
            owner: owner.clone(),
            source,
        })?;
        let provenance: Arc<str> = (&owner).into();

        match &target {
            Target::Node { path } => {
                replacement.set_provenance(Arc::clone(&provenance));
                tree.replace(path, replacement)?;
            }
            Target::Slice { path, start, end } => {
                let (start, end) = (start / 2, end / 2);
                let items = slice_items(&owner, &target, replacement, &provenance)?;
                let delta = tree.splice(path, start, end, items)?;
                report.element_delta += delta;

                if delta != 0 {
                    for other in &mut pending {
                        report.shifted_targets += other.shift_for_splice(path, start, end, delta);
                    }
                }
            }
        }
        report.applied += 1;
    }

    Ok(report)
}

fn resolve(tree: &Tree, target: &Target) -> Result<NodeHandle, ApplyError> {
    let node = match target {
        Target::Node { path } => tree.get(path)?,
        Target::Slice { path, start, end } => tree.get_range(path, start / 2, end / 2)?,
    };
    Ok(node)
}

fn resolve_sources(
    tree: &Tree,
    sources: &IndexMap<String, Target>,
) -> Result<Sources, ApplyError> {
    let resolved = sources
        .iter()
        .map(|(name, target)| Ok((name.clone(), resolve(tree, target)?)))
        .collect::<Result<IndexMap<_, _>, ApplyError>>()?;
    Ok(Sources::new(resolved))
}

/// Children of a slice replacement, tagged with the producing transformer
fn slice_items(
    owner: &TransformerId,
    target: &Target,
    replacement: NodeHandle,
    provenance: &Arc<str>,
) -> Result<Vec<NodeHandle>, ApplyError> {
    match replacement.into_node() {
        Node::List(items) => Ok(items
            .into_iter()
            .map(|item| item.with_provenance(Arc::clone(provenance)))
            .collect()),
        other => Err(ApplyError::ReplacementShape {
            owner: owner.clone(),
            target: target.to_string(),
            found: other.shape(),
        }),
    }
}
