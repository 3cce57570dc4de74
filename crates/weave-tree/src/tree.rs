//! The whole-batch structural tree
//!
//! [`Tree`] is the root list of classes. Reads return shared views that stay
//! valid, and unchanged, after later writes. Writes take `&mut self`, so no
//! reader can observe a half-applied mutation.

use crate::cache::ExpansionCache;
use crate::class::{ArtifactId, ClassHeader, ClassSlot, LazyClass};
use crate::codec::ClassCodec;
use crate::error::TreeError;
use crate::hash::ContentHash;
use crate::node::{Node, NodeHandle, Shape};
use crate::path::{PathEntry, TreePath};
use std::sync::Arc;

/// A node together with the path it was resolved at
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub path: TreePath,
    pub node: NodeHandle,
}

impl Located {
    /// Child addressed by `entry`
    #[must_use]
    pub fn child(&self, entry: impl Into<PathEntry>) -> Option<Located> {
        let entry = entry.into();
        self.node.child(&entry).map(|node| Located {
            path: self.path.child(entry),
            node: node.share(),
        })
    }

    /// Every child, in order
    #[must_use]
    pub fn children(&self) -> Vec<Located> {
        match &*self.node {
            Node::Value(_) => Vec::new(),
            Node::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, node)| Located {
                    path: self.path.index(i),
                    node: node.share(),
                })
                .collect(),
            Node::Map(entries) => entries
                .iter()
                .map(|(k, node)| Located {
                    path: self.path.key(k.as_str()),
                    node: node.share(),
                })
                .collect(),
        }
    }
}

/// Root list of class slots plus the machinery to expand them
#[derive(Debug)]
pub struct Tree {
    slots: Vec<ClassSlot>,
    codec: Arc<dyn ClassCodec>,
    cache: ExpansionCache,
    generation: u64,
}

impl Tree {
    /// Empty tree
    #[must_use]
    pub fn new(codec: Arc<dyn ClassCodec>, cache: ExpansionCache) -> Self {
        Self {
            slots: Vec::new(),
            codec,
            cache,
            generation: 0,
        }
    }

    /// Append an input artifact as a lazy class
    ///
    /// Only the header is decoded here.
    ///
    /// # Errors
    /// Returns error if the codec cannot read the header
    pub fn add_artifact(&mut self, id: ArtifactId, bytes: Arc<[u8]>) -> Result<usize, TreeError> {
        let index = self.slots.len();
        let header = self
            .codec
            .read_header(&bytes)
            .map_err(|source| TreeError::Codec { index, source })?;
        let hash = ContentHash::compute(&bytes);
        tracing::trace!(%id, class = %header.name, hash = %hash.short(), "added artifact");

        self.slots.push(ClassSlot {
            origin: Some(id),
            source: Some(LazyClass {
                header,
                bytes,
                hash,
            }),
            written: None,
        });
        self.generation += 1;
        Ok(index)
    }

    /// Append a class that has no input artifact
    pub fn push_class(&mut self, node: NodeHandle) -> usize {
        self.slots.push(ClassSlot::synthetic(node));
        self.generation += 1;
        self.slots.len() - 1
    }

    /// Number of classes in the root list
    #[inline]
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.slots.len()
    }

    /// Class slots in root-list order
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[ClassSlot] {
        &self.slots
    }

    /// Bumped by every mutation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The expansion cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ExpansionCache {
        &self.cache
    }

    /// The codec classes are decoded with
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &dyn ClassCodec {
        self.codec.as_ref()
    }

    fn slot(&self, index: usize) -> Result<&ClassSlot, TreeError> {
        self.slots.get(index).ok_or(TreeError::OutOfBounds {
            path: TreePath::root(),
            index,
            len: self.slots.len(),
        })
    }

    /// Header of the class at `index`
    ///
    /// Untouched classes answer from the eagerly decoded header.
    ///
    /// # Errors
    /// Returns error if the index is out of bounds or a written class lost
    /// its header attributes
    pub fn class_header(&self, index: usize) -> Result<ClassHeader, TreeError> {
        let slot = self.slot(index)?;
        match (&slot.written, &slot.source) {
            (None, Some(lazy)) => Ok(lazy.header.clone()),
            (Some(node), _) => {
                ClassHeader::from_node(node).map_err(|source| TreeError::Codec { index, source })
            }
            (None, None) => Err(TreeError::NotFound {
                path: TreePath::class(index),
            }),
        }
    }

    /// Full structure of the class at `index`, expanding it if needed
    ///
    /// # Errors
    /// Returns error if the index is out of bounds or expansion fails
    pub fn class_node(&self, index: usize) -> Result<NodeHandle, TreeError> {
        let slot = self.slot(index)?;
        match (&slot.written, &slot.source) {
            (Some(node), _) => Ok(node.share()),
            (None, Some(lazy)) => self
                .cache
                .get_or_expand(lazy.hash, &lazy.bytes, self.codec.as_ref())
                .map_err(|source| TreeError::Codec { index, source }),
            (None, None) => Err(TreeError::NotFound {
                path: TreePath::class(index),
            }),
        }
    }

    /// Shared view of the node at `path`
    ///
    /// Header attributes of untouched classes do not trigger expansion.
    /// The root path yields a list of every class.
    ///
    /// # Errors
    /// Returns error if the path does not resolve
    pub fn get(&self, path: &TreePath) -> Result<NodeHandle, TreeError> {
        let Some(class_index) = path.get(0) else {
            return self.get_range(path, 0, self.slots.len());
        };
        let index = class_index.as_index().ok_or_else(|| TreeError::ShapeMismatch {
            path: TreePath::root(),
            expected: Shape::Map,
            found: Shape::List,
        })?;

        if path.len() == 2 {
            if let (Some(key), Some(lazy)) = (path.entries()[1].as_key(), self.header_only(index)?) {
                if let Some(node) = lazy.attribute(key) {
                    return Ok(NodeHandle::new(node));
                }
            }
        }

        let mut current = self.class_node(index)?;
        for depth in 1..path.len() {
            let entry = &path.entries()[depth];
            let next = match current.child(entry) {
                Some(child) => child.share(),
                None => {
                    let parent = TreePath::new(path.entries()[..depth].iter().cloned());
                    return Err(TreeError::missing_child(
                        &parent,
                        current.shape(),
                        current.len(),
                        entry,
                    ));
                }
            };
            current = next;
        }
        Ok(current)
    }

    fn header_only(&self, index: usize) -> Result<Option<&ClassHeader>, TreeError> {
        let slot = self.slot(index)?;
        Ok(match (&slot.written, &slot.source) {
            (None, Some(lazy)) => Some(&lazy.header),
            _ => None,
        })
    }

    /// [`get`](Self::get) with the path attached
    ///
    /// # Errors
    /// Returns error if the path does not resolve
    pub fn locate(&self, path: &TreePath) -> Result<Located, TreeError> {
        Ok(Located {
            path: path.clone(),
            node: self.get(path)?,
        })
    }

    /// Every class, located at its root-list path
    ///
    /// # Errors
    /// Returns error if a class fails to expand
    pub fn classes(&self) -> Result<Vec<Located>, TreeError> {
        (0..self.slots.len())
            .map(|i| self.locate(&TreePath::class(i)))
            .collect()
    }

    /// List of shared views of `[start, end)` of the list at `list_path`
    ///
    /// # Errors
    /// Returns error if the path is not a list or the range is out of bounds
    pub fn get_range(
        &self,
        list_path: &TreePath,
        start: usize,
        end: usize,
    ) -> Result<NodeHandle, TreeError> {
        if start > end {
            return Err(TreeError::InvalidRange {
                path: list_path.clone(),
                start,
                end,
            });
        }

        if list_path.is_root() {
            check_bounds(list_path, end, self.slots.len())?;
            let items = (start..end)
                .map(|i| self.class_node(i))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(NodeHandle::new(Node::List(items)));
        }

        let list = self.get(list_path)?;
        let items = list.as_list().ok_or_else(|| TreeError::ShapeMismatch {
            path: list_path.clone(),
            expected: Shape::List,
            found: list.shape(),
        })?;
        check_bounds(list_path, end, items.len())?;
        Ok(NodeHandle::new(Node::List(items[start..end].to_vec())))
    }

    /// Put `node` at `path`: map-put or list-set in the parent
    ///
    /// Writing below an untouched class expands and pins it first.
    ///
    /// # Errors
    /// Returns error for the root path or if the parent does not resolve
    pub fn replace(&mut self, path: &TreePath, node: NodeHandle) -> Result<(), TreeError> {
        let entries = path.entries();
        let Some(first) = entries.first() else {
            return Err(TreeError::EmptyPath);
        };
        let index = class_entry(first)?;

        if entries.len() == 1 {
            let len = self.slots.len();
            let slot = self.slots.get_mut(index).ok_or(TreeError::OutOfBounds {
                path: TreePath::root(),
                index,
                len,
            })?;
            slot.written = Some(node);
            self.generation += 1;
            return Ok(());
        }

        let root = self.class_root_mut(index)?;
        let parent = descend_mut(root, path, entries.len() - 1)?;
        let parent_path = TreePath::new(entries[..entries.len() - 1].iter().cloned());
        let last = &entries[entries.len() - 1];
        let shape = parent.shape();
        let len = parent.len();

        match (parent.make_mut(), last) {
            (Node::Map(map), PathEntry::Key(key)) => {
                map.insert(key.clone(), node);
            }
            (Node::List(list), PathEntry::Index(i)) if *i < list.len() => {
                list[*i] = node;
            }
            _ => return Err(TreeError::missing_child(&parent_path, shape, len, last)),
        }

        self.generation += 1;
        Ok(())
    }

    /// Replace `[start, end)` of the list at `list_path` with `items`
    ///
    /// On the root list this removes and inserts whole classes; inserted
    /// classes have no input artifact. Returns the change in element count.
    ///
    /// # Errors
    /// Returns error if the path is not a list or the range is out of bounds
    pub fn splice(
        &mut self,
        list_path: &TreePath,
        start: usize,
        end: usize,
        items: Vec<NodeHandle>,
    ) -> Result<isize, TreeError> {
        if start > end {
            return Err(TreeError::InvalidRange {
                path: list_path.clone(),
                start,
                end,
            });
        }
        let delta = signed(items.len()) - signed(end - start);

        if list_path.is_root() {
            check_bounds(list_path, end, self.slots.len())?;
            let removed: Vec<_> = self
                .slots
                .splice(start..end, items.into_iter().map(ClassSlot::synthetic))
                .collect();
            for slot in &removed {
                if let Some(origin) = slot.origin {
                    tracing::debug!(%origin, "class removed from batch");
                }
            }
            self.generation += 1;
            return Ok(delta);
        }

        let entries = list_path.entries();
        let index = class_entry(&entries[0])?;
        let root = self.class_root_mut(index)?;
        let target = descend_mut(root, list_path, entries.len())?;
        let found = target.shape();
        let list = target
            .make_mut()
            .as_list_mut()
            .ok_or_else(|| TreeError::ShapeMismatch {
                path: list_path.clone(),
                expected: Shape::List,
                found,
            })?;
        check_bounds(list_path, end, list.len())?;
        list.splice(start..end, items);

        self.generation += 1;
        Ok(delta)
    }

    /// Writable class root, expanding and pinning an untouched class
    fn class_root_mut(&mut self, index: usize) -> Result<&mut NodeHandle, TreeError> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or(TreeError::OutOfBounds {
            path: TreePath::root(),
            index,
            len,
        })?;

        let root = match slot.written.take() {
            Some(node) => node,
            None => {
                let lazy = slot.source.as_ref().ok_or(TreeError::NotFound {
                    path: TreePath::class(index),
                })?;
                tracing::debug!(class = %lazy.header.name, "expanding class before write");
                self.cache
                    .get_or_expand(lazy.hash, &lazy.bytes, self.codec.as_ref())
                    .map_err(|source| TreeError::Codec { index, source })?
            }
        };
        Ok(slot.written.insert(root))
    }
}

/// Walk `path.entries()[1..end]` from a class root, promoting every node on
/// the way so the returned handle can be written
fn descend_mut<'a>(
    mut current: &'a mut NodeHandle,
    path: &TreePath,
    end: usize,
) -> Result<&'a mut NodeHandle, TreeError> {
    for depth in 1..end {
        let entry = &path.entries()[depth];
        let shape = current.shape();
        let len = current.len();
        current = match current.make_mut().child_mut(entry) {
            Some(child) => child,
            None => {
                let parent = TreePath::new(path.entries()[..depth].iter().cloned());
                return Err(TreeError::missing_child(&parent, shape, len, entry));
            }
        };
    }
    Ok(current)
}

fn class_entry(entry: &PathEntry) -> Result<usize, TreeError> {
    entry.as_index().ok_or_else(|| TreeError::ShapeMismatch {
        path: TreePath::root(),
        expected: Shape::Map,
        found: Shape::List,
    })
}

fn check_bounds(path: &TreePath, end: usize, len: usize) -> Result<(), TreeError> {
    if end > len {
        return Err(TreeError::OutOfBounds {
            path: path.clone(),
            index: end,
            len,
        });
    }
    Ok(())
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonClassCodec;
    use pretty_assertions::assert_eq;

    fn class_node(name: &str, fields: &[&str]) -> Node {
        Node::map([
            ("kind", Node::string("class")),
            ("name", Node::string(name)),
            ("super", Node::string("java/lang/Object")),
            ("interfaces", Node::empty_list()),
            ("fields", Node::list(fields.iter().map(|f| Node::string(*f)))),
        ])
    }

    fn tree_with(classes: &[(&str, &[&str])]) -> Tree {
        let codec = JsonClassCodec::new();
        let mut tree = Tree::new(Arc::new(codec), ExpansionCache::new(64));
        for (i, (name, fields)) in classes.iter().enumerate() {
            let bytes = codec.to_bytes(&class_node(name, fields)).unwrap();
            tree.add_artifact(ArtifactId(i as u32), bytes.into()).unwrap();
        }
        tree
    }

    fn p(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    #[test]
    fn header_reads_do_not_expand() {
        let tree = tree_with(&[("a/A", &["x"])]);
        assert_eq!(tree.get(&p("0.name")).unwrap().as_str(), Some("a/A"));
        assert_eq!(tree.get(&p("0.kind")).unwrap().as_str(), Some("class"));
        assert_eq!(tree.cache().stats().expansions, 0);

        assert_eq!(tree.get(&p("0.fields.0")).unwrap().as_str(), Some("x"));
        assert_eq!(tree.cache().stats().expansions, 1);
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let tree = tree_with(&[("a/A", &["x", "y"])]);
        let first = tree.get(&p("0.fields")).unwrap();
        let second = tree.get(&p("0.fields")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn get_reports_missing_children() {
        let tree = tree_with(&[("a/A", &["x"])]);
        assert!(matches!(
            tree.get(&p("0.fields.3")),
            Err(TreeError::OutOfBounds { index: 3, len: 1, .. })
        ));
        assert!(matches!(tree.get(&p("0.methods")), Err(TreeError::NotFound { .. })));
        assert!(matches!(
            tree.get(&p("0.name.0")),
            Err(TreeError::ShapeMismatch { expected: Shape::List, found: Shape::Value, .. })
        ));
        assert!(matches!(tree.get(&p("4")), Err(TreeError::OutOfBounds { .. })));
    }

    #[test]
    fn replace_pins_expansion_and_keeps_views() {
        let mut tree = tree_with(&[("a/A", &["x", "y"])]);
        let before = tree.get(&p("0.fields")).unwrap();
        let generation = tree.generation();

        tree.replace(&p("0.fields.1"), NodeHandle::new(Node::string("z")))
            .unwrap();

        assert!(!tree.slots()[0].is_untouched());
        assert!(tree.generation() > generation);
        assert_eq!(tree.get(&p("0.fields.1")).unwrap().as_str(), Some("z"));
        assert_eq!(before.at(1).and_then(|n| n.as_str()), Some("y"));

        let cached = tree.cache().get_or_expand(
            ContentHash::compute(tree.slots()[0].original_bytes().unwrap()),
            tree.slots()[0].original_bytes().unwrap(),
            tree.codec(),
        );
        assert_eq!(
            cached.unwrap().get("fields").unwrap().at(1).unwrap().as_str(),
            Some("y")
        );
    }

    #[test]
    fn replace_map_key_inserts() {
        let mut tree = tree_with(&[("a/A", &[])]);
        tree.replace(&p("0.signature"), NodeHandle::new(Node::string("<T>")))
            .unwrap();
        assert_eq!(tree.get(&p("0.signature")).unwrap().as_str(), Some("<T>"));
    }

    #[test]
    fn replace_root_is_rejected() {
        let mut tree = tree_with(&[("a/A", &[])]);
        assert!(matches!(
            tree.replace(&TreePath::root(), NodeHandle::new(Node::empty_list())),
            Err(TreeError::EmptyPath)
        ));
    }

    #[test]
    fn replace_whole_class_keeps_origin() {
        let mut tree = tree_with(&[("a/A", &[])]);
        tree.replace(&p("0"), NodeHandle::new(class_node("a/Renamed", &[])))
            .unwrap();
        assert_eq!(tree.slots()[0].origin(), Some(ArtifactId(0)));
        assert_eq!(tree.class_header(0).unwrap().name, "a/Renamed");
    }

    #[test]
    fn splice_reports_delta() {
        let mut tree = tree_with(&[("a/A", &["a", "b", "c", "d", "e"])]);
        let delta = tree
            .splice(&p("0.fields"), 1, 3, vec![NodeHandle::new(Node::string("n"))])
            .unwrap();
        assert_eq!(delta, -1);

        let fields = tree.get(&p("0.fields")).unwrap();
        let names: Vec<_> = fields
            .as_list()
            .unwrap()
            .iter()
            .map(|n| n.as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "n", "d", "e"]);
    }

    #[test]
    fn splice_requires_list() {
        let mut tree = tree_with(&[("a/A", &["a"])]);
        assert!(matches!(
            tree.splice(&p("0.name"), 0, 0, Vec::new()),
            Err(TreeError::ShapeMismatch { expected: Shape::List, .. })
        ));
        assert!(matches!(
            tree.splice(&p("0.fields"), 0, 4, Vec::new()),
            Err(TreeError::OutOfBounds { .. })
        ));
        assert!(matches!(
            tree.splice(&p("0.fields"), 1, 0, Vec::new()),
            Err(TreeError::InvalidRange { .. })
        ));
    }

    #[test]
    fn splice_root_inserts_and_removes_classes() {
        let mut tree = tree_with(&[("a/A", &[]), ("a/B", &[])]);
        let delta = tree
            .splice(
                &TreePath::root(),
                0,
                1,
                vec![
                    NodeHandle::new(class_node("a/X", &[])),
                    NodeHandle::new(class_node("a/Y", &[])),
                ],
            )
            .unwrap();
        assert_eq!(delta, 1);
        assert_eq!(tree.class_count(), 3);
        assert_eq!(tree.slots()[0].origin(), None);
        assert_eq!(tree.slots()[2].origin(), Some(ArtifactId(1)));
        assert_eq!(tree.class_header(1).unwrap().name, "a/Y");
    }

    #[test]
    fn get_range_of_list_and_root() {
        let tree = tree_with(&[("a/A", &["a", "b", "c"]), ("a/B", &[])]);
        let range = tree.get_range(&p("0.fields"), 1, 3).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range.at(0).and_then(|n| n.as_str()), Some("b"));

        let classes = tree.get_range(&TreePath::root(), 0, 2).unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(tree.get(&TreePath::root()).unwrap(), classes);
    }

    #[test]
    fn located_children_carry_paths() {
        let tree = tree_with(&[("a/A", &["a", "b"])]);
        let fields = tree.locate(&p("0.fields")).unwrap();
        let children = fields.children();
        assert_eq!(children[1].path, p("0.fields.1"));
        assert_eq!(fields.child(0usize).unwrap().node.as_str(), Some("a"));
        assert_eq!(tree.classes().unwrap()[0].path, TreePath::class(0));
    }

    #[test]
    fn eviction_does_not_lose_untouched_classes() {
        let tree = tree_with(&[("a/A", &["a"])]);
        let first = tree.get(&p("0.fields")).unwrap();
        tree.cache().invalidate_all();
        let second = tree.get(&p("0.fields")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn synthetic_class_has_header() {
        let mut tree = tree_with(&[]);
        let index = tree.push_class(NodeHandle::new(class_node("a/New", &[])));
        assert_eq!(tree.class_header(index).unwrap().name, "a/New");
        assert!(tree.slots()[index].original_bytes().is_none());
    }
}
