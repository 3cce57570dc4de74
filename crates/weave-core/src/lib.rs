//! Weave Core - Transformation Engine
//!
//! Runs a set of independently written transformers over a batch of class
//! artifacts:
//! - Plans rounds from round declarations
//! - Orders each round's transformations by target containment and reads
//! - Rejects overlapping and identical targets as authoring conflicts
//! - Applies transformations, renumbering pending targets after splices
//! - Re-encodes only the classes that were written to
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weave_core::{EngineConfig, TransformationEngine};
//! use weave_tree::JsonClassCodec;
//!
//! let mut engine = TransformationEngine::new(Arc::new(JsonClassCodec::new()))
//!     .with_config(EngineConfig::from_path("weave.toml")?);
//! engine.register(my_transformer)?;
//! engine.add_class(bytes);
//!
//! let output = engine.process()?;
//! println!("re-encoded {} classes", output.modified_count());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;

// Re-exports for convenience
pub use config::{ConfigError, EngineConfig};
pub use engine::TransformationEngine;
pub use error::EngineError;
pub use logging::{init_json_tracing, init_tracing};
pub use output::{ArtifactOrigin, ArtifactOutput, ProcessOutput, RoundSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
