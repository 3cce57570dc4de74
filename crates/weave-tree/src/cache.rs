//! Expansion cache using moka
//!
//! Full class expansions are expensive, so they are kept in a bounded cache
//! keyed by the artifact's content hash. Entries may be evicted at any time;
//! a miss recomputes the expansion from the immutable input bytes, which is
//! deterministic, so callers never observe the eviction.

use crate::codec::{ClassCodec, CodecError};
use crate::hash::ContentHash;
use crate::node::NodeHandle;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache (eventually consistent)
    pub entry_count: u64,
    /// Number of times the codec had to expand a class
    pub expansions: u64,
}

/// Bounded cache of expanded classes
#[derive(Debug, Clone)]
pub struct ExpansionCache {
    inner: Cache<ContentHash, NodeHandle>,
    expansions: Arc<AtomicU64>,
}

impl ExpansionCache {
    /// Create cache holding at most `max_capacity` expanded classes
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            expansions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached expansion of `bytes`, expanding through `codec` on a miss
    ///
    /// The returned handle is a shared view; writers promote it.
    ///
    /// # Errors
    /// Returns the codec error if expansion fails
    pub fn get_or_expand(
        &self,
        hash: ContentHash,
        bytes: &[u8],
        codec: &dyn ClassCodec,
    ) -> Result<NodeHandle, CodecError> {
        if let Some(cached) = self.inner.get(&hash) {
            return Ok(cached.share());
        }

        let expanded = NodeHandle::new(codec.expand(bytes)?);
        self.expansions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(hash = %hash.short(), "expanded class");

        let view = expanded.share();
        self.inner.insert(hash, expanded);
        Ok(view)
    }

    /// Drop one entry
    #[inline]
    pub fn invalidate(&self, hash: &ContentHash) {
        self.inner.invalidate(hash);
    }

    /// Drop every entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
            expansions: self.expansions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ExpansionCache {
    fn default() -> Self {
        Self::new(512)
    }
}
