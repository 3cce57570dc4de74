//! Generic dependency sorter
//!
//! Orders items given a pairwise oracle answering "does A depend on B".
//! Items are layered Kahn-style: each layer is every remaining item with no
//! outstanding dependency, in ascending item index. When no item is ready the
//! remaining graph has a cycle. A cycle held together by at least one weak
//! edge is broken by dropping one such edge. A cycle of strong edges only is
//! an error.

use crate::error::SortError;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;
use std::fmt::Display;

/// Strength of a dependency of A on B
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dependency {
    /// No ordering constraint
    None,
    /// B should come first; dropped to break a cycle
    Weak,
    /// B must come first
    Strong,
}

/// Pairwise dependency oracle
pub trait DependencyOracle<T> {
    /// Does `a` depend on `b`, i.e. must `b` come before `a`
    ///
    /// # Errors
    /// Returns error if the pair can never be ordered
    fn depends(&self, a: &T, b: &T) -> Result<Dependency, SortError>;
}

impl<T, F> DependencyOracle<T> for F
where
    F: Fn(&T, &T) -> Result<Dependency, SortError>,
{
    fn depends(&self, a: &T, b: &T) -> Result<Dependency, SortError> {
        self(a, b)
    }
}

/// Dependency graph over a slice of items
///
/// Node `i` of the graph is item `i`. An edge `b -> a` means `a` depends on
/// `b`.
#[derive(Debug)]
pub struct DependencySorter<'a, T> {
    items: &'a [T],
    graph: StableDiGraph<usize, Dependency>,
}

impl<'a, T: Display> DependencySorter<'a, T> {
    /// Query `oracle` for every ordered pair of distinct items
    ///
    /// # Errors
    /// Returns the first oracle error
    pub fn new(items: &'a [T], oracle: &impl DependencyOracle<T>) -> Result<Self, SortError> {
        let mut graph = StableDiGraph::with_capacity(items.len(), 0);
        for i in 0..items.len() {
            graph.add_node(i);
        }

        for (a, item_a) in items.iter().enumerate() {
            for (b, item_b) in items.iter().enumerate() {
                if a == b {
                    continue;
                }
                let dependency = oracle.depends(item_a, item_b)?;
                if dependency != Dependency::None {
                    graph.add_edge(NodeIndex::new(b), NodeIndex::new(a), dependency);
                }
            }
        }

        Ok(Self { items, graph })
    }

    /// Number of dependency edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Item indices grouped in layers
    ///
    /// Every item of a layer only depends on items of earlier layers, except
    /// for dropped weak edges.
    ///
    /// # Errors
    /// Returns [`SortError::Cycle`] if a cycle has no weak edge to drop
    pub fn sort_layers(mut self) -> Result<Vec<Vec<usize>>, SortError> {
        let mut remaining: BTreeSet<usize> = (0..self.items.len()).collect();
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| {
                    self.graph
                        .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                        .next()
                        .is_none()
                })
                .collect();

            if ready.is_empty() {
                self.break_cycle()?;
                continue;
            }

            for &i in &ready {
                self.graph.remove_node(NodeIndex::new(i));
                remaining.remove(&i);
            }
            layers.push(ready);
        }

        Ok(layers)
    }

    /// Item indices in one flat order
    ///
    /// # Errors
    /// Returns [`SortError::Cycle`] if a cycle has no weak edge to drop
    pub fn sort(self) -> Result<Vec<usize>, SortError> {
        Ok(self.sort_layers()?.into_iter().flatten().collect())
    }

    /// Drop one weak edge from the source component with the lowest item
    fn break_cycle(&mut self) -> Result<(), SortError> {
        let component = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.iter().all(|&node| {
                    self.graph
                        .neighbors_directed(node, Direction::Incoming)
                        .all(|from| scc.contains(&from))
                })
            })
            .min_by_key(|scc| scc.iter().map(|n| n.index()).min())
            .unwrap_or_default();

        let weakest = component
            .iter()
            .flat_map(|&node| self.graph.edges_directed(node, Direction::Incoming))
            .filter(|edge| *edge.weight() == Dependency::Weak && component.contains(&edge.source()))
            .map(|edge| (edge.target().index(), edge.source().index(), edge.id()))
            .min_by_key(|&(dependent, dependency, _)| (dependent, dependency));

        let Some((dependent, dependency, edge)) = weakest else {
            let mut members: Vec<usize> = component.iter().map(|n| n.index()).collect();
            members.sort_unstable();
            return Err(SortError::Cycle {
                members: members.iter().map(|&i| self.items[i].to_string()).collect(),
            });
        };

        tracing::warn!(
            dependent = %self.items[dependent],
            dependency = %self.items[dependency],
            "dropping weak dependency to break a cycle"
        );
        self.graph.remove_edge(edge);
        Ok(())
    }
}

/// Layer `items` with `oracle`
///
/// # Errors
/// Returns oracle conflicts and unbreakable cycles
pub fn sort_layers<T: Display>(
    items: &[T],
    oracle: &impl DependencyOracle<T>,
) -> Result<Vec<Vec<usize>>, SortError> {
    DependencySorter::new(items, oracle)?.sort_layers()
}

/// Flat order of `items` under `oracle`
///
/// # Errors
/// Returns oracle conflicts and unbreakable cycles
pub fn sort<T: Display>(
    items: &[T],
    oracle: &impl DependencyOracle<T>,
) -> Result<Vec<usize>, SortError> {
    DependencySorter::new(items, oracle)?.sort()
}

/// Move `items` into the order given by `order`
///
/// Indices missing from `order` are dropped.
#[must_use]
pub fn reorder<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Oracle over item indices backed by an edge table
    struct Table(HashMap<(usize, usize), Dependency>);

    impl Table {
        fn new(edges: &[(usize, usize, Dependency)]) -> Self {
            Self(edges.iter().map(|&(a, b, d)| ((a, b), d)).collect())
        }
    }

    impl DependencyOracle<usize> for Table {
        fn depends(&self, a: &usize, b: &usize) -> Result<Dependency, SortError> {
            Ok(self.0.get(&(*a, *b)).copied().unwrap_or(Dependency::None))
        }
    }

    fn items(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn independent_items_form_one_layer() {
        let layers = sort_layers(&items(3), &Table::new(&[])).unwrap();
        assert_eq!(layers, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn dependencies_form_layers() {
        // 0 depends on 2, 1 depends on 0
        let oracle = Table::new(&[(0, 2, Dependency::Strong), (1, 0, Dependency::Weak)]);
        let layers = sort_layers(&items(4), &oracle).unwrap();
        assert_eq!(layers, vec![vec![2, 3], vec![0], vec![1]]);
    }

    #[test]
    fn weak_cycle_is_broken_at_lowest_pair() {
        // 0 -> 1 strong, 1 -> 0 weak
        let oracle = Table::new(&[(0, 1, Dependency::Strong), (1, 0, Dependency::Weak)]);
        let order = sort(&items(2), &oracle).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn weak_cycle_of_three() {
        let oracle = Table::new(&[
            (0, 1, Dependency::Weak),
            (1, 2, Dependency::Weak),
            (2, 0, Dependency::Weak),
        ]);
        // Dropping 0 -> 1 leaves 1 after 2 after 0
        let order = sort(&items(3), &oracle).unwrap();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn strong_cycle_fails_naming_members() {
        let oracle = Table::new(&[
            (0, 1, Dependency::Strong),
            (1, 0, Dependency::Strong),
            (2, 0, Dependency::Strong),
        ]);
        let err = sort(&items(3), &oracle).unwrap_err();
        assert_eq!(
            err,
            SortError::Cycle {
                members: vec!["0".into(), "1".into()]
            }
        );
    }

    #[test]
    fn downstream_cycle_is_not_chosen_first() {
        // {0, 1} strong cycle depends on the weak cycle {2, 3}
        let oracle = Table::new(&[
            (0, 1, Dependency::Strong),
            (1, 0, Dependency::Strong),
            (0, 2, Dependency::Strong),
            (2, 3, Dependency::Weak),
            (3, 2, Dependency::Weak),
        ]);
        let err = sort(&items(4), &oracle).unwrap_err();
        assert!(matches!(err, SortError::Cycle { members } if members == ["0", "1"]));
    }

    #[test]
    fn oracle_errors_propagate() {
        let oracle = |a: &usize, b: &usize| {
            if a + b == 1 {
                Err(SortError::Conflict {
                    kind: crate::ConflictKind::Overlapping,
                    first: a.to_string(),
                    second: b.to_string(),
                })
            } else {
                Ok(Dependency::None)
            }
        };
        assert!(matches!(
            sort(&items(2), &oracle),
            Err(SortError::Conflict { .. })
        ));
    }

    #[test]
    fn reorder_moves_items() {
        let items = vec!["a", "b", "c"];
        assert_eq!(reorder(items, &[2, 0, 1]), vec!["c", "a", "b"]);
    }

    proptest! {
        #[test]
        fn acyclic_edges_are_respected(n in 1usize..10, raw in prop::collection::vec((0usize..10, 0usize..10, any::<bool>()), 0..30)) {
            // Only edges from higher to lower index, so the graph is acyclic
            let edges: Vec<_> = raw
                .into_iter()
                .filter(|&(a, b, _)| a < n && b < a)
                .map(|(a, b, strong)| (a, b, if strong { Dependency::Strong } else { Dependency::Weak }))
                .collect();
            let order = sort(&items(n), &Table::new(&edges)).unwrap();

            let mut position = vec![0; n];
            for (pos, &item) in order.iter().enumerate() {
                position[item] = pos;
            }
            prop_assert_eq!(order.len(), n);
            for (a, b, _) in edges {
                prop_assert!(position[b] < position[a]);
            }
        }

        #[test]
        fn weak_only_graphs_always_sort(n in 1usize..8, raw in prop::collection::vec((0usize..8, 0usize..8), 0..30)) {
            let edges: Vec<_> = raw
                .into_iter()
                .filter(|&(a, b)| a < n && b < n && a != b)
                .map(|(a, b)| (a, b, Dependency::Weak))
                .collect();
            let order = sort(&items(n), &Table::new(&edges)).unwrap();
            let mut sorted = order.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sorted, items(n));
        }
    }
}
