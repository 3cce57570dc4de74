//! Transformation engine
//!
//! Owns the registered transformers and the input artifacts. A run builds a
//! fresh [`Tree`] over the inputs, plans rounds from the round declarations,
//! and per round collects, orders and applies every transformation before
//! the next round's transformers look at the tree. Classes nothing wrote to
//! come back as their input bytes.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::output::{ArtifactOrigin, ArtifactOutput, ProcessOutput, RoundSummary};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use weave_transform::{
    apply_batch, order_transformations, plan_rounds, reorder, Declaration, DeclaredOrder,
    TransformError, Transformation, Transformer, TransformerId,
};
use weave_tree::{
    ArtifactId, BatchHierarchy, ClassCodec, ClassHierarchy, EmptyHierarchy, ExpansionCache, Tree,
};

/// Resolves conflicts between transformers and applies them to a batch of
/// classes
pub struct TransformationEngine {
    config: EngineConfig,
    codec: Arc<dyn ClassCodec>,
    hierarchy: Arc<dyn ClassHierarchy>,
    transformers: Vec<Box<dyn Transformer>>,
    artifacts: Vec<Arc<[u8]>>,
}

impl TransformationEngine {
    /// Create an engine with default configuration and no external hierarchy
    #[must_use]
    pub fn new(codec: Arc<dyn ClassCodec>) -> Self {
        Self {
            config: EngineConfig::default(),
            codec,
            hierarchy: Arc::new(EmptyHierarchy),
            transformers: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Create an engine configured from a TOML file
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the file cannot be read or parsed
    pub fn from_config_path(
        codec: Arc<dyn ClassCodec>,
        path: impl AsRef<Path>,
    ) -> Result<Self, EngineError> {
        let config = EngineConfig::from_path(path)?;
        tracing::debug!(?config, "loaded engine configuration");
        Ok(Self::new(codec).with_config(config))
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With the hierarchy of classes outside the batch
    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: Arc<dyn ClassHierarchy>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a transformer
    ///
    /// Registration order breaks ties between otherwise unordered
    /// transformers.
    ///
    /// # Errors
    /// Returns error if a transformer with the same id is registered
    pub fn register(&mut self, transformer: impl Transformer + 'static) -> Result<(), EngineError> {
        let id = transformer.id();
        if self.transformers.iter().any(|t| t.id() == id) {
            return Err(EngineError::DuplicateTransformer { id: id.clone() });
        }
        tracing::debug!(transformer = %id, "registered transformer");
        self.transformers.push(Box::new(transformer));
        Ok(())
    }

    /// Ids of the registered transformers, in registration order
    #[must_use]
    pub fn transformer_ids(&self) -> Vec<TransformerId> {
        self.transformers.iter().map(|t| t.id().clone()).collect()
    }

    /// Add an input class artifact
    ///
    /// Bytes are only decoded when [`Self::process`] runs.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_class(&mut self, bytes: impl Into<Arc<[u8]>>) -> ArtifactId {
        let id = ArtifactId(self.artifacts.len() as u32);
        self.artifacts.push(bytes.into());
        id
    }

    /// Number of input artifacts
    #[inline]
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Run every transformer over the inputs
    ///
    /// # Errors
    /// Any error aborts the run without partial output: unreadable inputs,
    /// failing transformers, conflicting targets, strong cycles, unresolvable
    /// targets and encoding failures. Unknown transformers in declarations
    /// are errors only with `strict_declarations`.
    pub fn process(&self) -> Result<ProcessOutput, EngineError> {
        let declared = self.declared_order()?;
        let rounds = plan_rounds(&declared)?;
        tracing::info!(
            transformers = self.transformers.len(),
            artifacts = self.artifacts.len(),
            rounds = rounds.len(),
            "processing batch"
        );

        let cache = ExpansionCache::new(self.config.expansion_cache_capacity);
        let mut tree = Tree::new(Arc::clone(&self.codec), cache);
        for (index, bytes) in self.artifacts.iter().enumerate() {
            tree.add_artifact(artifact_id(index), Arc::clone(bytes))?;
        }

        let mut summaries = Vec::with_capacity(rounds.len());
        for (index, members) in rounds.iter().enumerate() {
            summaries.push(self.run_round(&mut tree, &declared, index, members)?);
        }

        let mut output = self.collect_output(&tree)?;
        output.rounds = summaries;
        output.cache = tree.cache().stats();
        tracing::info!(
            applied = output.applied(),
            modified = output.modified_count(),
            removed = output.removed.len(),
            "batch processed"
        );
        Ok(output)
    }

    fn declared_order(&self) -> Result<DeclaredOrder, EngineError> {
        let ids = self.transformer_ids();
        let mut order = DeclaredOrder::new(ids.iter().cloned());

        for transformer in &self.transformers {
            for kind in Declaration::ALL {
                let others = match kind {
                    Declaration::After => transformer.must_run_after(&ids),
                    Declaration::Before => transformer.must_run_before(&ids),
                    Declaration::RoundAfter => transformer.must_run_round_after(&ids),
                    Declaration::RoundBefore => transformer.must_run_round_before(&ids),
                };
                for other in &others {
                    let Err(unknown) = order.declare(transformer.id(), kind, other) else {
                        continue;
                    };
                    if self.config.strict_declarations {
                        return Err(unknown.into());
                    }
                    tracing::warn!(
                        transformer = %unknown.declared_by,
                        unknown = %unknown.unknown,
                        declaration = %kind,
                        "ignoring declaration against unknown transformer"
                    );
                }
            }
        }
        Ok(order)
    }

    fn run_round(
        &self,
        tree: &mut Tree,
        declared: &DeclaredOrder,
        index: usize,
        members: &[usize],
    ) -> Result<RoundSummary, EngineError> {
        let transformers: Vec<&dyn Transformer> = members
            .iter()
            .filter_map(|&i| self.transformers.get(i).map(|t| &**t))
            .collect();
        let ids: Vec<TransformerId> = transformers.iter().map(|t| t.id().clone()).collect();
        tracing::info!(round = index, transformers = ?ids, "starting round");

        let mut batch: Vec<Transformation> = Vec::new();
        for transformer in &transformers {
            batch.extend(collect(*transformer, tree)?);
        }
        let count = batch.len();

        let order = order_transformations(&batch, declared)?;
        let report = apply_batch(tree, reorder(batch, &order))?;
        tracing::debug!(
            round = index,
            applied = report.applied,
            element_delta = report.element_delta,
            shifted = report.shifted_targets,
            "round applied"
        );

        Ok(RoundSummary {
            index,
            transformers: ids,
            transformations: count,
            report,
        })
    }

    fn collect_output(&self, tree: &Tree) -> Result<ProcessOutput, EngineError> {
        let hierarchy = BatchHierarchy::from_tree(tree, self.hierarchy.as_ref())?;
        let mut output = ProcessOutput::default();
        let mut surviving = HashSet::new();

        for (index, slot) in tree.slots().iter().enumerate() {
            let origin = match slot.origin() {
                Some(id) => {
                    surviving.insert(id);
                    ArtifactOrigin::Replaces(id)
                }
                None => ArtifactOrigin::Introduced,
            };
            let name = tree.class_header(index)?.name;

            if let (true, Some(bytes)) = (slot.is_untouched(), slot.original_bytes()) {
                output.artifacts.push(ArtifactOutput {
                    origin,
                    name,
                    bytes: Arc::clone(bytes),
                    modified: false,
                });
                continue;
            }

            let node = tree.class_node(index)?;
            let bytes = self
                .codec
                .encode(&node, &hierarchy)
                .map_err(|source| EngineError::Codec {
                    class: name.clone(),
                    source,
                })?;
            tracing::debug!(class = %name, provenance = ?node.provenance(), "re-encoded class");
            output.artifacts.push(ArtifactOutput {
                origin,
                name,
                bytes: bytes.into(),
                modified: true,
            });
        }

        output.removed = (0..self.artifacts.len())
            .map(artifact_id)
            .filter(|id| !surviving.contains(id))
            .collect();
        Ok(output)
    }
}

impl std::fmt::Debug for TransformationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationEngine")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .field("transformers", &self.transformer_ids())
            .field("artifacts", &self.artifacts.len())
            .finish_non_exhaustive()
    }
}

/// Transformations of one transformer, checked to carry its id
fn collect(transformer: &dyn Transformer, tree: &Tree) -> Result<Vec<Transformation>, EngineError> {
    let id = transformer.id();
    let batch = transformer
        .transform(tree)
        .map_err(|source| EngineError::Transformer {
            id: id.clone(),
            source,
        })?;

    if let Some(foreign) = batch.iter().find(|t| t.owner() != id) {
        return Err(EngineError::Transformer {
            id: id.clone(),
            source: TransformError::InvalidInput(format!(
                "transformation owned by '{}'",
                foreign.owner()
            )),
        });
    }
    tracing::debug!(transformer = %id, transformations = batch.len(), "collected transformations");
    Ok(batch)
}

#[allow(clippy::cast_possible_truncation)]
fn artifact_id(index: usize) -> ArtifactId {
    ArtifactId(index as u32)
}
