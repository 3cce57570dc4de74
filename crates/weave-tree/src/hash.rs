//! Content hashes for class artifacts
//!
//! [`ContentHash`] identifies an input artifact by the Blake3 hash of its raw
//! bytes. The expansion cache is keyed by it, so two identical inputs share
//! one decoded structure.

use std::fmt::{self, Display, Formatter};

/// A 32-byte Blake3 hash of raw artifact bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// First 16 hex chars, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
