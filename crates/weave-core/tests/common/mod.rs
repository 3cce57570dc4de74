//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;
use weave_core::{ArtifactOutput, TransformationEngine};
use weave_test_utils::{field_names, ClassFixture};
use weave_transform::{TransformError, Transformation, TransformerId, Target};
use weave_tree::{ClassCodec, JsonClassCodec, Node, NodeHandle, Tree, TreePath};

/// Engine over the JSON codec with `classes` added in order
pub fn engine_with(classes: &[ClassFixture]) -> TransformationEngine {
    let mut engine = TransformationEngine::new(Arc::new(JsonClassCodec::new()));
    for class in classes {
        engine.add_class(class.bytes());
    }
    engine
}

/// Class with fields named after `names`
pub fn class_with_fields(name: &str, names: &[&str]) -> ClassFixture {
    names
        .iter()
        .fold(ClassFixture::new(name), |class, field| class.field(field))
}

pub fn fields(class: usize) -> TreePath {
    TreePath::class(class).key("fields")
}

pub fn field(class: usize, index: usize) -> TreePath {
    fields(class).index(index)
}

/// Field names of an output class
pub fn output_fields(artifact: &ArtifactOutput) -> Vec<String> {
    let node = JsonClassCodec::new()
        .expand(&artifact.bytes)
        .expect("output decodes");
    node.get("fields").map(|f| field_names(f)).unwrap_or_default()
}

/// Replace the `name` of a `{ name, .. }` map
pub fn renamed(node: NodeHandle, name: &str) -> Result<NodeHandle, TransformError> {
    let mut node = node;
    let map = node
        .make_mut()
        .as_map_mut()
        .ok_or_else(|| TransformError::InvalidInput("not a map".into()))?;
    map.insert("name".into(), NodeHandle::new(Node::string(name)));
    Ok(node)
}

/// Transformation renaming the field at `path`
pub fn rename(
    tree: &Tree,
    owner: &TransformerId,
    path: TreePath,
    name: &'static str,
) -> Result<Transformation, TransformError> {
    Transformation::builder(owner)
        .target(Target::node(path))
        .description(format!("rename to {name}"))
        .against(tree)
        .apply(move |node, _| renamed(node, name))
        .build()
}

/// Transformation replacing `range` of a field list with new fields
pub fn replace_fields(
    tree: &Tree,
    owner: &TransformerId,
    class: usize,
    range: std::ops::Range<usize>,
    names: &'static [&'static str],
) -> Result<Transformation, TransformError> {
    Transformation::builder(owner)
        .target(Target::slice(fields(class), range))
        .against(tree)
        .replace_with(Node::list(names.iter().map(|n| ClassFixture::field_node(n))))
        .build()
}
