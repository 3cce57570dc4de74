//! Addressing of what a transformation replaces or reads
//!
//! A [`Target`] is either a single node or a contiguous range of a list.
//! Slice bounds are kept in a virtual index space at twice the resolution of
//! real list positions, so a boundary point can be told apart from the
//! element that follows it. Only even virtual values are ever produced.

use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use weave_tree::{PathEntry, TreePath};

/// Node or list range addressed by a transformation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Exactly the node at `path`
    Node { path: TreePath },
    /// Virtual range `[start, end)` of the list at `path`
    Slice {
        path: TreePath,
        start: usize,
        end: usize,
    },
}

impl Target {
    /// Target a single node
    #[inline]
    #[must_use]
    pub fn node(path: TreePath) -> Self {
        Self::Node { path }
    }

    /// Target the real range `range` of the list at `path`
    #[inline]
    #[must_use]
    pub fn slice(path: TreePath, range: Range<usize>) -> Self {
        Self::Slice {
            path,
            start: range.start * 2,
            end: range.end * 2,
        }
    }

    /// Empty slice at real position `at`: replacing it inserts
    #[inline]
    #[must_use]
    pub fn insertion(path: TreePath, at: usize) -> Self {
        Self::slice(path, at..at)
    }

    /// Node path, or the list path of a slice
    #[inline]
    #[must_use]
    pub fn path(&self) -> &TreePath {
        match self {
            Self::Node { path } | Self::Slice { path, .. } => path,
        }
    }

    /// Is this a slice target
    #[inline]
    #[must_use]
    pub fn is_slice(&self) -> bool {
        matches!(self, Self::Slice { .. })
    }

    /// Real list range of a slice
    #[inline]
    #[must_use]
    pub fn real_range(&self) -> Option<Range<usize>> {
        match self {
            Self::Node { .. } => None,
            Self::Slice { start, end, .. } => Some(start / 2..end / 2),
        }
    }

    /// Does `other` lie inside this target
    ///
    /// Equal node targets contain each other. A slice contains the nodes of
    /// its range and everything below them. An empty slice only lies inside
    /// a slice that extends past it on both sides.
    #[must_use]
    pub fn contains(&self, other: &Target) -> bool {
        match self {
            Self::Node { path } => other.path().starts_with(path),
            Self::Slice { path, start, end } => {
                if let Self::Slice {
                    path: other_path,
                    start: other_start,
                    end: other_end,
                } = other
                {
                    if other_path == path {
                        return if other_start < other_end {
                            start <= other_start && other_end <= end
                        } else {
                            start < other_start && other_start < end
                        };
                    }
                }

                if !other.path().is_below(path) {
                    return false;
                }
                match other.path().get(path.len()) {
                    Some(PathEntry::Index(i)) => (*start..*end).contains(&(i * 2)),
                    _ => false,
                }
            }
        }
    }

    /// Do the two targets intersect without either containing the other
    ///
    /// Only two non-empty slices of the same list can overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Target) -> bool {
        match (self, other) {
            (
                Self::Slice { path, start, end },
                Self::Slice {
                    path: other_path,
                    start: other_start,
                    end: other_end,
                },
            ) => {
                path == other_path
                    && start < end
                    && other_start < other_end
                    && start < other_end
                    && other_start < end
                    && !self.contains(other)
                    && !other.contains(self)
            }
            _ => false,
        }
    }

    /// Same node, or same non-empty range
    ///
    /// Two insertions at one point are not identical; both apply.
    #[must_use]
    pub fn is_identical(&self, other: &Target) -> bool {
        match (self, other) {
            (Self::Node { path }, Self::Node { path: other_path }) => path == other_path,
            (Self::Slice { start, end, .. }, Self::Slice { .. }) => start < end && self == other,
            _ => false,
        }
    }

    /// Renumber after the real range `[start, end)` of the list at `list`
    /// was replaced by `end - start + delta` elements
    ///
    /// A path through an element of the range that has no counterpart in
    /// the replacement is left as is and reported as [`Shift::Invalidated`].
    pub fn shift_for_splice(
        &mut self,
        list: &TreePath,
        start: usize,
        end: usize,
        delta: isize,
    ) -> Shift {
        if delta == 0 {
            return Shift::Unchanged;
        }
        let mut moved = false;

        let path = match self {
            Self::Node { path } | Self::Slice { path, .. } => path,
        };
        if path.is_below(list) {
            let depth = list.len();
            if let Some(PathEntry::Index(i)) = path.get(depth) {
                let i = *i;
                if i >= end {
                    if let Some(shifted) = path.with_index_shifted(depth, delta) {
                        *path = shifted;
                        moved = true;
                    }
                } else if i >= start && i >= shift(end, delta) {
                    return Shift::Invalidated;
                }
            }
        }

        if let Self::Slice {
            path,
            start: slice_start,
            end: slice_end,
        } = self
        {
            if path == list {
                let virtual_delta = delta * 2;
                let (boundary, mutated_start) = (end * 2, start * 2);
                if slice_start == slice_end {
                    if *slice_start >= boundary {
                        *slice_start = shift(*slice_start, virtual_delta);
                        *slice_end = *slice_start;
                        moved = true;
                    }
                } else {
                    if *slice_start >= boundary {
                        *slice_start = shift(*slice_start, virtual_delta);
                        moved = true;
                    }
                    if *slice_end >= boundary && *slice_end > mutated_start {
                        *slice_end = shift(*slice_end, virtual_delta);
                        moved = true;
                    }
                }
            }
        }

        if moved {
            Shift::Shifted
        } else {
            Shift::Unchanged
        }
    }
}

/// Effect of a splice on a pending target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// Not affected
    Unchanged,
    /// Renumbered to keep addressing the same node
    Shifted,
    /// Addressed an element the splice removed
    Invalidated,
}

fn shift(index: usize, delta: isize) -> usize {
    index.saturating_add_signed(delta)
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { path } => write!(f, "{path}"),
            Self::Slice { path, start, end } => {
                write!(f, "{path}[{}..{})", start / 2, end / 2)
            }
        }
    }
}
