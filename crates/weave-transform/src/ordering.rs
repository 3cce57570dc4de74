//! The two sorting levels: transformers into rounds, then the
//! transformations of one round into application order

use crate::error::{ConflictKind, SortError};
use crate::sorter::{self, Dependency};
use crate::transformation::Transformation;
use crate::transformer::TransformerId;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Kind of ordering a transformer declares relative to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    /// Apply after the other, same round
    After,
    /// Apply before the other, same round
    Before,
    /// Run in a later round than the other
    RoundAfter,
    /// Run in an earlier round than the other
    RoundBefore,
}

impl Declaration {
    /// Every declaration kind
    pub const ALL: [Declaration; 4] = [
        Declaration::After,
        Declaration::Before,
        Declaration::RoundAfter,
        Declaration::RoundBefore,
    ];
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::After => write!(f, "must run after"),
            Self::Before => write!(f, "must run before"),
            Self::RoundAfter => write!(f, "must run in a round after"),
            Self::RoundBefore => write!(f, "must run in a round before"),
        }
    }
}

/// Declaration naming a transformer that is not registered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{declared_by} declares an order against unknown transformer '{unknown}'")]
pub struct UnknownTransformer {
    pub declared_by: TransformerId,
    pub unknown: TransformerId,
}

/// Normalized ordering declarations over the registered transformers
///
/// Pairs are stored as `(dependent, dependency)` positions in registration
/// order.
#[derive(Debug, Clone, Default)]
pub struct DeclaredOrder {
    ids: IndexMap<TransformerId, ()>,
    after: HashSet<(usize, usize)>,
    round_after: HashSet<(usize, usize)>,
}

impl DeclaredOrder {
    /// No declarations over `ids`, kept in the given order
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = TransformerId>) -> Self {
        Self {
            ids: ids.into_iter().map(|id| (id, ())).collect(),
            after: HashSet::new(),
            round_after: HashSet::new(),
        }
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &TransformerId> {
        self.ids.keys()
    }

    /// Registration position of `id`
    #[inline]
    #[must_use]
    pub fn position(&self, id: &TransformerId) -> Option<usize> {
        self.ids.get_index_of(id)
    }

    /// Record that `declarer` declares `kind` relative to `other`
    ///
    /// # Errors
    /// Returns error if either id is not registered
    pub fn declare(
        &mut self,
        declarer: &TransformerId,
        kind: Declaration,
        other: &TransformerId,
    ) -> Result<(), UnknownTransformer> {
        let unknown = |id: &TransformerId| UnknownTransformer {
            declared_by: declarer.clone(),
            unknown: id.clone(),
        };
        let a = self.position(declarer).ok_or_else(|| unknown(declarer))?;
        let b = self.position(other).ok_or_else(|| unknown(other))?;

        if a == b {
            tracing::warn!(transformer = %declarer, "ignoring ordering declared against itself");
            return Ok(());
        }

        match kind {
            Declaration::After => self.after.insert((a, b)),
            Declaration::Before => self.after.insert((b, a)),
            Declaration::RoundAfter => self.round_after.insert((a, b)),
            Declaration::RoundBefore => self.round_after.insert((b, a)),
        };
        Ok(())
    }

    /// `a` must apply after `b` when both are in one round
    #[inline]
    #[must_use]
    pub fn runs_after(&self, a: usize, b: usize) -> bool {
        self.after.contains(&(a, b))
    }

    /// `a` must run in a later round than `b`
    #[inline]
    #[must_use]
    pub fn runs_round_after(&self, a: usize, b: usize) -> bool {
        self.round_after.contains(&(a, b))
    }

    fn id_at(&self, position: usize) -> Option<&TransformerId> {
        self.ids.get_index(position).map(|(id, ())| id)
    }
}

/// Partition the registered transformers into rounds
///
/// Each round lists transformer positions in registration order.
/// Same-round declarations between transformers that end up in different
/// rounds are satisfied or contradicted by the round order and are logged.
///
/// # Errors
/// Returns [`SortError::Cycle`] if round declarations form a cycle
pub fn plan_rounds(order: &DeclaredOrder) -> Result<Vec<Vec<usize>>, SortError> {
    let named: Vec<Named<'_>> = order
        .ids()
        .enumerate()
        .map(|(position, id)| Named { id, position })
        .collect();

    let rounds = sorter::sort_layers(&named, &|a: &Named<'_>, b: &Named<'_>| {
        Ok::<_, SortError>(if order.runs_round_after(a.position, b.position) {
            Dependency::Strong
        } else {
            Dependency::None
        })
    })?;

    let mut round_of = vec![0; named.len()];
    for (round, members) in rounds.iter().enumerate() {
        for &member in members {
            round_of[member] = round;
        }
    }
    for &(a, b) in &order.after {
        if round_of[a] != round_of[b] {
            let (Some(dependent), Some(dependency)) = (order.id_at(a), order.id_at(b)) else {
                continue;
            };
            if round_of[a] < round_of[b] {
                tracing::warn!(%dependent, %dependency, "same-round order contradicts round order, ignored");
            } else {
                tracing::debug!(%dependent, %dependency, "same-round order already satisfied by rounds");
            }
        }
    }

    Ok(rounds)
}

struct Named<'a> {
    id: &'a TransformerId,
    position: usize,
}

impl fmt::Display for Named<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Dependency of transformation `a` on transformation `b` within one round
///
/// # Errors
/// Returns [`SortError::Conflict`] for overlapping or identical targets
pub fn transformation_dependency(
    a: &Transformation,
    b: &Transformation,
    order: &DeclaredOrder,
) -> Result<Dependency, SortError> {
    let (ta, tb) = (a.target(), b.target());
    let declared = match (order.position(a.owner()), order.position(b.owner())) {
        (Some(pa), Some(pb)) => (order.runs_after(pa, pb), order.runs_after(pb, pa)),
        _ => (false, false),
    };

    let conflict = if ta.overlaps(tb) {
        Some(ConflictKind::Overlapping)
    } else if ta.is_identical(tb) && declared == (false, false) {
        Some(ConflictKind::Identical)
    } else {
        None
    };
    if let Some(kind) = conflict {
        return Err(SortError::Conflict {
            kind,
            first: a.to_string(),
            second: b.to_string(),
        });
    }

    if declared.0 {
        return Ok(Dependency::Strong);
    }
    if ta.is_identical(tb) {
        return Ok(Dependency::None);
    }

    if ta.contains(tb) {
        return Ok(Dependency::Strong);
    }

    if a.sources().values().any(|source| tb.contains(source)) {
        return Ok(Dependency::Strong);
    }
    if a.sources().values().any(|source| source.overlaps(tb)) {
        return Ok(Dependency::Strong);
    }
    if a.sources().values().any(|source| source.contains(tb)) {
        return Ok(Dependency::Weak);
    }

    Ok(Dependency::None)
}

/// Application order of one round's transformations
///
/// Ties keep batch order.
///
/// # Errors
/// Returns conflicts and strong cycles
pub fn order_transformations(
    batch: &[Transformation],
    order: &DeclaredOrder,
) -> Result<Vec<usize>, SortError> {
    sorter::sort(batch, &|a: &Transformation, b: &Transformation| {
        transformation_dependency(a, b, order)
    })
}
