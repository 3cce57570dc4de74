//! Results of [`crate::TransformationEngine::process`]

use std::sync::Arc;
use weave_transform::{ApplyReport, TransformerId};
use weave_tree::{ArtifactId, CacheStats};

/// Where an output class came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactOrigin {
    /// Stands in the slot of an input artifact
    Replaces(ArtifactId),
    /// Added by a transformation
    Introduced,
}

/// One surviving class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutput {
    pub origin: ArtifactOrigin,
    /// Internal class name, e.g. `com/example/Foo`
    pub name: String,
    pub bytes: Arc<[u8]>,
    /// `false` when `bytes` are the untouched input bytes
    pub modified: bool,
}

/// What one round did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub index: usize,
    pub transformers: Vec<TransformerId>,
    pub transformations: usize,
    pub report: ApplyReport,
}

/// Output of a whole run
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Surviving classes in tree order
    pub artifacts: Vec<ArtifactOutput>,
    /// Input artifacts without a surviving slot
    pub removed: Vec<ArtifactId>,
    pub rounds: Vec<RoundSummary>,
    /// Expansion cache statistics at the end of the run
    pub cache: CacheStats,
}

impl ProcessOutput {
    /// Output class by internal name
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<&ArtifactOutput> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// Output standing in the slot of `id`
    #[must_use]
    pub fn replacing(&self, id: ArtifactId) -> Option<&ArtifactOutput> {
        self.artifacts
            .iter()
            .find(|a| a.origin == ArtifactOrigin::Replaces(id))
    }

    /// Number of re-encoded classes
    #[must_use]
    pub fn modified_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.modified).count()
    }

    /// Transformations applied over all rounds
    #[must_use]
    pub fn applied(&self) -> usize {
        self.rounds.iter().map(|r| r.report.applied).sum()
    }
}
