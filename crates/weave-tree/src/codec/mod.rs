//! Binary codec contract
//!
//! The tree never parses class files itself. A [`ClassCodec`] turns raw bytes
//! into a header plus an on-demand full expansion, and turns a finished class
//! node back into bytes.

mod json;

pub use json::JsonClassCodec;

use crate::class::ClassHeader;
use crate::hierarchy::ClassHierarchy;
use crate::node::Node;
use std::fmt::Debug;

/// Converts between raw class bytes and class nodes
///
/// # Contract
/// - `read_header` must be cheap and agree with the header keys of `expand`
/// - `expand` must be deterministic: the same bytes give equal nodes
/// - `encode` may consult the hierarchy (e.g. for common superclasses)
pub trait ClassCodec: Send + Sync + Debug {
    /// Decode only the header attributes
    ///
    /// # Errors
    /// Returns error if the bytes are not a class artifact
    fn read_header(&self, bytes: &[u8]) -> Result<ClassHeader, CodecError>;

    /// Decode the full class structure as a map node
    ///
    /// # Errors
    /// Returns error if the bytes are not a class artifact
    fn expand(&self, bytes: &[u8]) -> Result<Node, CodecError>;

    /// Encode a class map node back into bytes
    ///
    /// # Errors
    /// Returns error if the node is not a valid class structure
    fn encode(&self, class: &Node, hierarchy: &dyn ClassHierarchy) -> Result<Vec<u8>, CodecError>;
}

/// Errors from a codec
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Structure does not describe a class
    #[error("malformed class: {0}")]
    Malformed(String),

    /// Required attribute missing
    #[error("missing class attribute '{0}'")]
    MissingAttribute(&'static str),

    /// Codec-specific failure
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// JSON encoding or decoding failed
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
