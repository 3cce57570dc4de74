//! Class artifacts and their cheaply decoded headers

use crate::codec::CodecError;
use crate::node::{Node, NodeHandle};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Well-known keys of a class map
pub mod keys {
    /// Class kind (`class`, `interface`, ...)
    pub const KIND: &str = "kind";
    /// Internal class name (`java/lang/String`)
    pub const NAME: &str = "name";
    /// Superclass name, absent for roots
    pub const SUPER: &str = "super";
    /// Declared interface names
    pub const INTERFACES: &str = "interfaces";

    /// Keys answered from the header without expanding the class
    pub const HEADER: [&str; 4] = [KIND, NAME, SUPER, INTERFACES];
}

/// Identity of one input artifact, assigned in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactId(pub u32);

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "artifact#{}", self.0)
    }
}

/// Kind of class declared in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
    Module,
}

impl ClassKind {
    /// Name used in the `kind` attribute
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Annotation => "annotation",
            Self::Record => "record",
            Self::Module => "module",
        }
    }

    /// Interfaces and annotations are interface types
    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        matches!(self, Self::Interface | Self::Annotation)
    }
}

impl Display for ClassKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(Self::Class),
            "interface" => Ok(Self::Interface),
            "enum" => Ok(Self::Enum),
            "annotation" => Ok(Self::Annotation),
            "record" => Ok(Self::Record),
            "module" => Ok(Self::Module),
            other => Err(CodecError::Malformed(format!("unknown class kind '{other}'"))),
        }
    }
}

/// Attributes decoded eagerly from an artifact
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassHeader {
    pub kind: ClassKind,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    /// Header of a plain class
    #[must_use]
    pub fn new(name: impl Into<String>, super_name: Option<&str>) -> Self {
        Self {
            kind: ClassKind::Class,
            name: name.into(),
            super_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
        }
    }

    /// Set the kind
    #[must_use]
    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a declared interface
    #[must_use]
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Node for one header key, if the header knows it
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<Node> {
        match key {
            keys::KIND => Some(Node::string(self.kind.as_str())),
            keys::NAME => Some(Node::string(self.name.as_str())),
            keys::SUPER => self.super_name.as_deref().map(Node::string),
            keys::INTERFACES => Some(Node::list(
                self.interfaces.iter().map(|i| Node::string(i.as_str())),
            )),
            _ => None,
        }
    }

    /// Read the header keys back out of a class map
    ///
    /// # Errors
    /// Returns error if the node is not a map or lacks a valid kind or name
    pub fn from_node(node: &Node) -> Result<Self, CodecError> {
        let map = node
            .as_map()
            .ok_or_else(|| CodecError::Malformed(format!("class is a {}", node.shape())))?;

        let kind = map
            .get(keys::KIND)
            .and_then(|n| n.as_str())
            .ok_or(CodecError::MissingAttribute(keys::KIND))?
            .parse()?;
        let name = map
            .get(keys::NAME)
            .and_then(|n| n.as_str())
            .ok_or(CodecError::MissingAttribute(keys::NAME))?
            .to_string();
        let super_name = map
            .get(keys::SUPER)
            .and_then(|n| n.as_str())
            .map(str::to_string);
        let interfaces = match map.get(keys::INTERFACES) {
            None => Vec::new(),
            Some(list) => list
                .as_list()
                .ok_or_else(|| CodecError::Malformed("interfaces is not a list".into()))?
                .iter()
                .map(|n| {
                    n.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| CodecError::Malformed("interface name is not a string".into()))
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(Self {
            kind,
            name,
            super_name,
            interfaces,
        })
    }
}

/// Lazily expanded input artifact
#[derive(Debug, Clone)]
pub(crate) struct LazyClass {
    pub(crate) header: ClassHeader,
    pub(crate) bytes: Arc<[u8]>,
    pub(crate) hash: crate::hash::ContentHash,
}

/// One entry of the root list
///
/// A slot built from an input artifact starts lazy: only its header is
/// decoded. The first write pins a full expansion in `written`; from then on
/// the slot no longer depends on the cache. Slots inserted by a
/// transformation have no source and no origin.
#[derive(Debug, Clone)]
pub struct ClassSlot {
    pub(crate) origin: Option<ArtifactId>,
    pub(crate) source: Option<LazyClass>,
    pub(crate) written: Option<NodeHandle>,
}

impl ClassSlot {
    pub(crate) fn synthetic(node: NodeHandle) -> Self {
        Self {
            origin: None,
            source: None,
            written: Some(node),
        }
    }

    /// Input artifact this slot came from, `None` for introduced classes
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<ArtifactId> {
        self.origin
    }

    /// Nothing has been written to this class
    #[inline]
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.written.is_none()
    }

    /// Raw bytes of the input artifact
    #[inline]
    #[must_use]
    pub fn original_bytes(&self) -> Option<&Arc<[u8]>> {
        self.source.as_ref().map(|s| &s.bytes)
    }

    /// Pinned structure, present once the class was written
    #[inline]
    #[must_use]
    pub fn written(&self) -> Option<&NodeHandle> {
        self.written.as_ref()
    }

    /// Header as decoded from the input, if any
    #[inline]
    #[must_use]
    pub fn source_header(&self) -> Option<&ClassHeader> {
        self.source.as_ref().map(|s| &s.header)
    }
}
