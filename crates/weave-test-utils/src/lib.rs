//! Testing utilities for the classweave workspace
//!
//! Class fixtures encoded with the JSON codec, a codec that counts its calls,
//! and a small library hierarchy.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use weave_tree::hierarchy::OBJECT;
use weave_tree::{
    keys, ClassCodec, ClassHeader, ClassHierarchy, ClassInfo, ClassKind, CodecError,
    JsonClassCodec, MapHierarchy, Node,
};

/// Builder for a class node in the layout the JSON codec reads
#[derive(Debug, Clone)]
pub struct ClassFixture {
    kind: ClassKind,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<Node>,
    methods: Vec<Node>,
}

impl ClassFixture {
    pub fn new(name: &str) -> Self {
        Self {
            kind: ClassKind::Class,
            name: name.to_string(),
            super_name: Some(OBJECT.to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(name)
        }
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(Self::field_node(name));
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods.push(Self::method_node(name, descriptor));
        self
    }

    /// `{ name, descriptor: "I" }`
    pub fn field_node(name: &str) -> Node {
        Node::map([
            ("name", Node::string(name)),
            ("descriptor", Node::string("I")),
        ])
    }

    pub fn method_node(name: &str, descriptor: &str) -> Node {
        Node::map([
            ("name", Node::string(name)),
            ("descriptor", Node::string(descriptor)),
            ("code", Node::empty_list()),
        ])
    }

    pub fn header(&self) -> ClassHeader {
        ClassHeader {
            kind: self.kind,
            name: self.name.clone(),
            super_name: self.super_name.clone(),
            interfaces: self.interfaces.clone(),
        }
    }

    pub fn node(&self) -> Node {
        let header = self.header();
        let mut entries: Vec<(&str, Node)> = keys::HEADER
            .iter()
            .filter_map(|key| header.attribute(key).map(|node| (*key, node)))
            .collect();
        entries.push(("fields", Node::list(self.fields.iter().cloned())));
        entries.push(("methods", Node::list(self.methods.iter().cloned())));
        Node::map(entries)
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        JsonClassCodec::new()
            .to_bytes(&self.node())
            .expect("fixture classes always encode")
            .into()
    }
}

/// Names of the `{ name, .. }` maps in a list node
pub fn field_names(list: &Node) -> Vec<String> {
    list.as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.get("name").and_then(|n| n.as_str()).map(str::to_string))
        .collect()
}

/// JSON codec that counts expansions and encodes
#[derive(Debug, Clone, Default)]
pub struct CountingCodec {
    inner: JsonClassCodec,
    expansions: Arc<AtomicUsize>,
    encodes: Arc<AtomicUsize>,
}

impl CountingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expansions(&self) -> usize {
        self.expansions.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl ClassCodec for CountingCodec {
    fn read_header(&self, bytes: &[u8]) -> Result<ClassHeader, CodecError> {
        self.inner.read_header(bytes)
    }

    fn expand(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        self.expansions.fetch_add(1, Ordering::SeqCst);
        self.inner.expand(bytes)
    }

    fn encode(&self, class: &Node, hierarchy: &dyn ClassHierarchy) -> Result<Vec<u8>, CodecError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(class, hierarchy)
    }
}

/// `java/lang/Object`, `java/lang/Runnable` and a slice of `java/util`
pub fn library_hierarchy() -> MapHierarchy {
    MapHierarchy::new()
        .with(ClassInfo::class(OBJECT, None))
        .with(ClassInfo::interface("java/lang/Runnable"))
        .with(ClassInfo::interface("java/util/Collection"))
        .with(ClassInfo::interface("java/util/List").implementing("java/util/Collection"))
        .with(
            ClassInfo::class("java/util/AbstractList", Some(OBJECT))
                .implementing("java/util/List"),
        )
        .with(ClassInfo::class(
            "java/util/ArrayList",
            Some("java/util/AbstractList"),
        ))
}
