//! Weave Tree
//!
//! Copy-on-write structural tree over a batch of class artifacts.
//!
//! # Core Concepts
//!
//! - [`Tree`]: Root list of classes, expanded lazily on first deep access
//! - [`Node`] / [`NodeHandle`]: Value, list or map nodes shared until written
//! - [`TreePath`]: Positional address of a node (`3.fields.1`)
//! - [`ClassCodec`]: Contract for turning bytes into class nodes and back
//! - [`ExpansionCache`]: Bounded moka cache of expansions keyed by [`ContentHash`]
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_tree::{ExpansionCache, JsonClassCodec, Tree, TreePath};
//!
//! let mut tree = Tree::new(Arc::new(JsonClassCodec::new()), ExpansionCache::new(64));
//! tree.add_artifact(ArtifactId(0), bytes)?;
//!
//! // Header reads never expand the class
//! let name = tree.get(&"0.name".parse()?)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod class;
pub mod codec;
mod error;
mod hash;
pub mod hierarchy;
mod node;
mod path;
mod tree;

pub use cache::{CacheStats, ExpansionCache};
pub use class::{keys, ArtifactId, ClassHeader, ClassKind, ClassSlot};
pub use codec::{ClassCodec, CodecError, JsonClassCodec};
pub use error::TreeError;
pub use hash::ContentHash;
pub use hierarchy::{BatchHierarchy, ClassHierarchy, ClassInfo, EmptyHierarchy, MapHierarchy};
pub use node::{Node, NodeHandle, Ownership, Shape, Value};
pub use path::{PathEntry, PathError, TreePath};
pub use tree::{Located, Tree};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
