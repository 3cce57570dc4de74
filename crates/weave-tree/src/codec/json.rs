//! JSON class codec
//!
//! Stores a class tree as the JSON form of its [`Node`]. Useful for fixtures
//! and for dumping a transformed tree while debugging conflicting patches.

use super::{ClassCodec, CodecError};
use crate::class::{keys, ClassHeader};
use crate::hierarchy::ClassHierarchy;
use crate::node::{Node, Shape};

/// Reference codec over the JSON form of class nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonClassCodec {
    pretty: bool,
}

impl JsonClassCodec {
    /// Compact output
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output
    #[inline]
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Encode a class node without hierarchy checks
    ///
    /// # Errors
    /// Returns error if the node cannot be serialized
    pub fn to_bytes(&self, class: &Node) -> Result<Vec<u8>, CodecError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(class)?
        } else {
            serde_json::to_vec(class)?
        };
        Ok(bytes)
    }

    fn parse_class(bytes: &[u8]) -> Result<Node, CodecError> {
        let node: Node = serde_json::from_slice(bytes)?;
        if node.shape() != Shape::Map {
            return Err(CodecError::Malformed(format!(
                "expected a class map, found a {}",
                node.shape()
            )));
        }
        Ok(node)
    }
}

impl ClassCodec for JsonClassCodec {
    fn read_header(&self, bytes: &[u8]) -> Result<ClassHeader, CodecError> {
        ClassHeader::from_node(&Self::parse_class(bytes)?)
    }

    fn expand(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        Self::parse_class(bytes)
    }

    fn encode(&self, class: &Node, hierarchy: &dyn ClassHierarchy) -> Result<Vec<u8>, CodecError> {
        let header = ClassHeader::from_node(class)?;

        if let Some(super_name) = header.super_name.as_deref() {
            if hierarchy.is_interface(super_name) {
                return Err(CodecError::Malformed(format!(
                    "{} extends interface {super_name}",
                    header.name
                )));
            }
        }
        if class.get(keys::INTERFACES).is_some_and(|n| n.shape() != Shape::List) {
            return Err(CodecError::Malformed("interfaces is not a list".into()));
        }

        self.to_bytes(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{ClassInfo, EmptyHierarchy, MapHierarchy};

    fn class_node(name: &str, super_name: &str) -> Node {
        Node::map([
            ("kind", Node::string("class")),
            ("name", Node::string(name)),
            ("super", Node::string(super_name)),
            ("interfaces", Node::empty_list()),
            ("fields", Node::list([Node::string("f")])),
        ])
    }

    #[test]
    fn header_and_expansion_agree() {
        let codec = JsonClassCodec::new();
        let bytes = codec.to_bytes(&class_node("a/B", "a/A")).unwrap();

        let header = codec.read_header(&bytes).unwrap();
        assert_eq!(header.name, "a/B");
        assert_eq!(header.super_name.as_deref(), Some("a/A"));

        let node = codec.expand(&bytes).unwrap();
        assert_eq!(node, class_node("a/B", "a/A"));
    }

    #[test]
    fn expand_is_deterministic() {
        let codec = JsonClassCodec::pretty();
        let bytes = codec.to_bytes(&class_node("a/B", "a/A")).unwrap();
        assert_eq!(codec.expand(&bytes).unwrap(), codec.expand(&bytes).unwrap());
    }

    #[test]
    fn rejects_non_map_classes() {
        let codec = JsonClassCodec::new();
        let bytes = serde_json::to_vec(&Node::int(3)).unwrap();
        assert!(matches!(codec.expand(&bytes), Err(CodecError::Malformed(_))));
        assert!(matches!(codec.expand(b"not json"), Err(CodecError::Json(_))));
    }

    #[test]
    fn encode_rejects_interface_superclass() {
        let codec = JsonClassCodec::new();
        let mut hierarchy = MapHierarchy::new();
        hierarchy.insert(ClassInfo::interface("a/I"));

        let result = codec.encode(&class_node("a/B", "a/I"), &hierarchy);
        assert!(matches!(result, Err(CodecError::Malformed(_))));

        assert!(codec.encode(&class_node("a/B", "a/A"), &EmptyHierarchy).is_ok());
    }
}
