//! Weave Transform
//!
//! Conflict resolution and application of transformations over a
//! [`weave_tree::Tree`].
//!
//! # Core Concepts
//!
//! - [`Target`]: A node, or a range of a list in doubled index space
//! - [`Transformation`]: One target, named sources, and a replacement function
//! - [`Transformer`]: Named producer of transformations with ordering declarations
//! - [`plan_rounds`] / [`order_transformations`]: The two sorting levels
//! - [`apply_batch`]: In-order application with renumbering of pending targets
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_transform::{apply_batch, order_transformations, reorder};
//!
//! let order = order_transformations(&batch, &declared)?;
//! let report = apply_batch(&mut tree, reorder(batch, &order))?;
//! println!("applied {} transformations", report.applied);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod applier;
mod error;
mod ordering;
pub mod sorter;
mod target;
mod transformation;
mod transformer;

pub use applier::{apply_batch, ApplyReport};
pub use error::{ApplyError, ConflictKind, SortError, TransformError};
pub use ordering::{
    order_transformations, plan_rounds, transformation_dependency, Declaration, DeclaredOrder,
    UnknownTransformer,
};
pub use sorter::{reorder, Dependency, DependencyOracle, DependencySorter};
pub use target::{Shift, Target};
pub use transformation::{ApplyFn, Sources, Transformation, TransformationBuilder};
pub use transformer::{FnTransformer, Transformer, TransformerId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
