//! Structural nodes and copy-on-write handles
//!
//! A [`Node`] is a leaf [`Value`], an ordered list, or an insertion-ordered
//! map. Children are held through [`NodeHandle`], which shares buffers between
//! holders and clones only on write.

use crate::path::PathEntry;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Opaque leaf literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Integer literal
    Int(i64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// Bytes the tree does not look into
    Blob(Arc<[u8]>),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// The three node shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Leaf literal
    Value,
    /// Ordered list
    List,
    /// String-keyed map
    Map,
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// One unit of the structural tree
///
/// The shape of a node never changes in place; replacement always puts a
/// whole new node at the attachment point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Leaf literal
    Value(Value),
    /// Index-addressed children
    List(Vec<NodeHandle>),
    /// Key-addressed children, insertion ordered
    Map(IndexMap<String, NodeHandle>),
}

impl Node {
    /// Integer leaf
    #[inline]
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Value(Value::Int(value))
    }

    /// String leaf
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Value(Value::Str(value.into()))
    }

    /// Boolean leaf
    #[inline]
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }

    /// Opaque bytes leaf
    #[inline]
    #[must_use]
    pub fn blob(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Value(Value::Blob(bytes.into()))
    }

    /// List of freshly owned children
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Self::List(items.into_iter().map(NodeHandle::new).collect())
    }

    /// Map of freshly owned children
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), NodeHandle::new(v)))
                .collect(),
        )
    }

    /// Empty list
    #[inline]
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Shape of this node
    #[inline]
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Value(_) => Shape::Value,
            Self::List(_) => Shape::List,
            Self::Map(_) => Shape::Map,
        }
    }

    /// Leaf value
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// String leaf content
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer leaf content
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Value(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// List children
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[NodeHandle]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Mutable list children
    #[inline]
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<NodeHandle>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map children
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, NodeHandle>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Mutable map children
    #[inline]
    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, NodeHandle>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Map child by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NodeHandle> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// List child by index
    #[inline]
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&NodeHandle> {
        self.as_list().and_then(|l| l.get(index))
    }

    /// Child addressed by one path entry
    #[must_use]
    pub fn child(&self, entry: &PathEntry) -> Option<&NodeHandle> {
        match (self, entry) {
            (Self::List(items), PathEntry::Index(i)) => items.get(*i),
            (Self::Map(entries), PathEntry::Key(k)) => entries.get(k),
            _ => None,
        }
    }

    /// Mutable child addressed by one path entry
    pub fn child_mut(&mut self, entry: &PathEntry) -> Option<&mut NodeHandle> {
        match (self, entry) {
            (Self::List(items), PathEntry::Index(i)) => items.get_mut(*i),
            (Self::Map(entries), PathEntry::Key(k)) => entries.get_mut(k),
            _ => None,
        }
    }

    /// Number of children (0 for leaves)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Value(_) => 0,
            Self::List(items) => items.len(),
            Self::Map(entries) => entries.len(),
        }
    }

    /// No children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for Node {
    /// Structural equality. Map entry order is significant.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a.len() == b.len() && a.iter().eq(b.iter()),
            _ => false,
        }
    }
}

impl Eq for Node {}

/// Write permission carried by a [`NodeHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The holder may write in place
    Owned,
    /// A read-only view; writing promotes to `Owned` first
    Shared,
}

/// Copy-on-write reference to a [`Node`]
///
/// Cloning a handle yields a `Shared` view of the same buffer. Writing
/// through [`make_mut`](Self::make_mut) promotes the handle to `Owned` and
/// clones the node first if any other handle still sees it. Calling
/// `make_mut` on each level while walking down a path promotes the whole
/// ancestor chain, leaving every other holder untouched.
///
/// The provenance is metadata naming the transformer that produced the node.
/// Equality ignores it.
#[derive(Debug)]
pub struct NodeHandle {
    node: Arc<Node>,
    ownership: Ownership,
    provenance: Option<Arc<str>>,
}

impl NodeHandle {
    /// New owned handle
    #[inline]
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self {
            node: Arc::new(node),
            ownership: Ownership::Owned,
            provenance: None,
        }
    }

    /// Read-only view of the same buffer
    #[inline]
    #[must_use]
    pub fn share(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            ownership: Ownership::Shared,
            provenance: self.provenance.clone(),
        }
    }

    /// Current write permission
    #[inline]
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Can be written without promotion
    #[inline]
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// Both handles see the same buffer
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Mutable access, cloning the node if the buffer is aliased
    pub fn make_mut(&mut self) -> &mut Node {
        self.ownership = Ownership::Owned;
        Arc::make_mut(&mut self.node)
    }

    /// Owned handle with the same content
    ///
    /// Children stay shared; they are promoted one by one when written.
    #[must_use]
    pub fn into_owned(mut self) -> Self {
        if self.ownership == Ownership::Shared {
            self.node = Arc::new(Node::clone(&self.node));
            self.ownership = Ownership::Owned;
        }
        self
    }

    /// Owned copy, leaving `self` untouched
    #[inline]
    #[must_use]
    pub fn to_owned_handle(&self) -> Self {
        self.share().into_owned()
    }

    /// Take the node out, cloning it only if the buffer is aliased
    #[must_use]
    pub fn into_node(self) -> Node {
        Arc::try_unwrap(self.node).unwrap_or_else(|shared| Node::clone(&shared))
    }

    /// Transformer that produced this node
    #[inline]
    #[must_use]
    pub fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    /// Tag with the producing transformer
    #[inline]
    pub fn set_provenance(&mut self, owner: impl Into<Arc<str>>) {
        self.provenance = Some(owner.into());
    }

    /// Tagged copy of this handle
    #[inline]
    #[must_use]
    pub fn with_provenance(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.set_provenance(owner);
        self
    }
}

impl Clone for NodeHandle {
    fn clone(&self) -> Self {
        self.share()
    }
}

impl Deref for NodeHandle {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl AsRef<Node> for NodeHandle {
    fn as_ref(&self) -> &Node {
        &self.node
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.node == *other.node
    }
}

impl Eq for NodeHandle {}

impl From<Node> for NodeHandle {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

impl Serialize for NodeHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Node::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::map([
            ("name", Node::string("a/B")),
            ("fields", Node::list([Node::string("x"), Node::string("y")])),
        ])
    }

    #[test]
    fn constructors_and_accessors() {
        let node = sample();
        assert_eq!(node.shape(), Shape::Map);
        assert_eq!(node.len(), 2);
        assert_eq!(node.get("name").and_then(|n| n.as_str()), Some("a/B"));
        let fields = node.get("fields").unwrap();
        assert_eq!(fields.shape(), Shape::List);
        assert_eq!(fields.at(1).and_then(|n| n.as_str()), Some("y"));
        assert!(fields.at(2).is_none());
    }

    #[test]
    fn child_requires_matching_entry_kind() {
        let node = sample();
        assert!(node.child(&PathEntry::Key("name".into())).is_some());
        assert!(node.child(&PathEntry::Index(0)).is_none());
        let fields = node.get("fields").unwrap();
        assert!(fields.child(&PathEntry::Index(0)).is_some());
        assert!(fields.child(&PathEntry::Key("0".into())).is_none());
    }

    #[test]
    fn map_equality_is_order_sensitive() {
        let a = Node::map([("x", Node::int(1)), ("y", Node::int(2))]);
        let b = Node::map([("y", Node::int(2)), ("x", Node::int(1))]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn clone_is_shared_view() {
        let owned = NodeHandle::new(sample());
        assert!(owned.is_owned());
        let view = owned.clone();
        assert_eq!(view.ownership(), Ownership::Shared);
        assert!(view.ptr_eq(&owned));
    }

    #[test]
    fn make_mut_does_not_affect_other_views() {
        let mut owned = NodeHandle::new(sample());
        let view = owned.share();

        owned
            .make_mut()
            .as_map_mut()
            .unwrap()
            .insert("name".into(), NodeHandle::new(Node::string("a/C")));

        assert!(!view.ptr_eq(&owned));
        assert_eq!(view.get("name").and_then(|n| n.as_str()), Some("a/B"));
        assert_eq!(owned.get("name").and_then(|n| n.as_str()), Some("a/C"));
    }

    #[test]
    fn promotion_keeps_untouched_children_shared() {
        let original = NodeHandle::new(sample());
        let mut copy = original.share();

        let root = copy.make_mut();
        let name = root.as_map_mut().unwrap().get_mut("name").unwrap();
        *name.make_mut() = Node::string("changed");

        let before = original.get("fields").unwrap();
        let after = copy.get("fields").unwrap();
        assert!(before.ptr_eq(after));
        assert_eq!(original.get("name").and_then(|n| n.as_str()), Some("a/B"));
    }

    #[test]
    fn make_mut_on_unique_buffer_does_not_clone() {
        let mut handle = NodeHandle::new(Node::int(1)).share();
        let before = Arc::as_ptr(&handle.node);
        *handle.make_mut() = Node::int(2);
        assert_eq!(Arc::as_ptr(&handle.node), before);
        assert!(handle.is_owned());
    }

    #[test]
    fn into_owned_detaches_from_view() {
        let source = NodeHandle::new(sample());
        let view = source.share();
        let owned = view.into_owned();
        assert!(owned.is_owned());
        assert!(!owned.ptr_eq(&source));
        assert_eq!(owned, source);

        let copy = source.to_owned_handle();
        assert!(copy.is_owned() && !copy.ptr_eq(&source));
    }

    #[test]
    fn provenance_is_ignored_by_equality() {
        let a = NodeHandle::new(Node::int(7)).with_provenance("first");
        let b = NodeHandle::new(Node::int(7));
        assert_eq!(a.provenance(), Some("first"));
        assert_eq!(a, b);
    }

    #[test]
    fn serde_roundtrip_preserves_structure() {
        let node = sample();
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
