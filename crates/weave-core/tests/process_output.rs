//! What a run hands back: bytes, origins, rounds and configuration effects.
//!
//! Guarantees exercised here:
//! - Classes no transformation touched come back as their input bytes and
//!   are never expanded or re-encoded.
//! - Root splices introduce and remove classes, tracked by origin.
//! - Round declarations make later transformers see earlier rounds' output.
//! - Cache capacity changes performance only, never results.
//! - Configuration loads from TOML and controls declaration strictness.

mod common;

use common::{class_with_fields, engine_with, field, output_fields, rename};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write;
use std::sync::Arc;
use weave_core::{ArtifactOrigin, EngineConfig, EngineError, TransformationEngine};
use weave_test_utils::{library_hierarchy, ClassFixture, CountingCodec};
use weave_transform::{FnTransformer, TransformError, Transformation, Target};
use weave_tree::{ArtifactId, Node, TreePath};

/// Untouched inputs are returned byte for byte.
#[test]
fn untouched_classes_keep_their_bytes() {
    let codec = CountingCodec::new();
    let classes = [
        class_with_fields("a/A", &["x"]),
        class_with_fields("a/B", &["y"]),
    ];
    let mut engine = TransformationEngine::new(Arc::new(codec.clone()));
    let inputs: Vec<_> = classes.iter().map(ClassFixture::bytes).collect();
    for bytes in &inputs {
        engine.add_class(Arc::clone(bytes));
    }
    engine
        .register(FnTransformer::new("touch-b", |tree, id| {
            Ok(vec![rename(tree, id, field(1, 0), "z")?])
        }))
        .unwrap();

    let output = engine.process().unwrap();

    let a = output.replacing(ArtifactId(0)).unwrap();
    assert!(!a.modified);
    assert_eq!(a.bytes, inputs[0]);
    let b = output.replacing(ArtifactId(1)).unwrap();
    assert!(b.modified);
    assert_eq!(output_fields(b), vec!["z"]);
    assert_eq!(codec.encodes(), 1);
    assert_eq!(codec.expansions(), 1);
}

#[test]
fn run_without_transformations_never_expands() {
    let codec = CountingCodec::new();
    let mut engine = TransformationEngine::new(Arc::new(codec.clone()));
    engine.add_class(ClassFixture::new("a/A").bytes());
    engine
        .register(FnTransformer::new("reader", |tree, _| {
            // header reads are answered without expansion
            tree.class_header(0)
                .map_err(|e| TransformError::InvalidInput(e.to_string()))?;
            Ok(Vec::new())
        }))
        .unwrap();

    let output = engine.process().unwrap();

    assert_eq!(output.modified_count(), 0);
    assert_eq!(codec.expansions(), 0);
    assert_eq!(codec.encodes(), 0);
}

/// Replacing a root range drops the old class and introduces a new one.
#[test]
fn root_splice_introduces_and_removes_classes() {
    let mut engine = engine_with(&[ClassFixture::new("a/Old"), ClassFixture::new("a/Kept")]);
    engine
        .register(FnTransformer::new("regenerate", |tree, id| {
            Ok(vec![Transformation::builder(id)
                .target(Target::slice(TreePath::root(), 0..1))
                .against(tree)
                .replace_with(Node::list([
                    ClassFixture::new("a/Gen1").node(),
                    ClassFixture::new("a/Gen2").field("made").node(),
                ]))
                .build()?])
        }))
        .unwrap();

    let output = engine.process().unwrap();

    let names: Vec<_> = output.artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a/Gen1", "a/Gen2", "a/Kept"]);
    assert_eq!(output.removed, vec![ArtifactId(0)]);
    assert_eq!(output.artifacts[0].origin, ArtifactOrigin::Introduced);
    assert_eq!(output_fields(&output.artifacts[1]), vec!["made"]);
    let kept = output.artifact("a/Kept").unwrap();
    assert_eq!(kept.origin, ArtifactOrigin::Replaces(ArtifactId(1)));
    assert!(!kept.modified);
}

/// A later round reads what an earlier round wrote.
#[test]
fn later_round_sees_earlier_round() {
    let mut engine = engine_with(&[class_with_fields("a/A", &["a"])]);
    engine
        .register(
            FnTransformer::new("mirror", |tree, id| {
                let name = tree
                    .get(&field(0, 0).key("name"))
                    .map_err(|e| TransformError::InvalidInput(e.to_string()))?;
                let mirrored = format!("{}_mirror", name.as_str().unwrap_or_default());
                Ok(vec![Transformation::builder(id)
                    .target(Target::insertion(common::fields(0), 1))
                    .against(tree)
                    .replace_with(Node::list([ClassFixture::field_node(&mirrored)]))
                    .build()?])
            })
            .round_after("rename"),
        )
        .unwrap();
    engine
        .register(FnTransformer::new("rename", |tree, id| {
            Ok(vec![rename(tree, id, field(0, 0), "renamed")?])
        }))
        .unwrap();

    let output = engine.process().unwrap();

    assert_eq!(output.rounds.len(), 2);
    assert_eq!(output.rounds[0].transformers[0].as_str(), "rename");
    assert_eq!(output.rounds[1].transformers[0].as_str(), "mirror");
    assert_eq!(
        output_fields(&output.artifacts[0]),
        vec!["renamed", "renamed_mirror"]
    );
}

#[test]
fn round_cycle_is_fatal() {
    let mut engine = engine_with(&[]);
    engine
        .register(FnTransformer::new("a", |_, _| Ok(Vec::new())).round_after("b"))
        .unwrap();
    engine
        .register(FnTransformer::new("b", |_, _| Ok(Vec::new())).round_after("a"))
        .unwrap();

    assert!(engine.process().unwrap_err().is_conflict());
}

/// Counting fields of every class forces expansions through a one-entry cache.
fn count_fields_engine(capacity: u64) -> TransformationEngine {
    let classes = [
        class_with_fields("a/A", &["a", "b", "c"]),
        class_with_fields("a/B", &["d"]),
        class_with_fields("a/C", &["e", "f"]),
    ];
    let mut engine =
        engine_with(&classes).with_config(EngineConfig::new().with_cache_capacity(capacity));
    engine
        .register(FnTransformer::new("census", |tree, id| {
            let mut total = 0;
            for class in 0..tree.class_count() {
                let fields = tree
                    .get(&common::fields(class))
                    .map_err(|e| TransformError::InvalidInput(e.to_string()))?;
                total += fields.len();
            }
            let name = format!("total_{total}");
            Ok(vec![Transformation::builder(id)
                .target(Target::insertion(common::fields(2), 0))
                .against(tree)
                .replace_with(Node::list([ClassFixture::field_node(&name)]))
                .build()?])
        }))
        .unwrap();
    engine
}

#[test]
fn cache_eviction_is_transparent() {
    let small = count_fields_engine(1).process().unwrap();
    let large = count_fields_engine(512).process().unwrap();

    assert_eq!(small.artifacts, large.artifacts);
    assert_eq!(output_fields(&small.artifacts[2]), vec!["total_6", "e", "f"]);
}

#[test]
fn encoder_consults_batch_hierarchy() {
    let mut engine = engine_with(&[ClassFixture::new("a/Impl")])
        .with_hierarchy(Arc::new(library_hierarchy()));
    engine
        .register(FnTransformer::new("bad-super", |tree, id| {
            Ok(vec![Transformation::builder(id)
                .target(Target::node(TreePath::class(0).key("super")))
                .against(tree)
                .replace_with(Node::string("java/lang/Runnable"))
                .build()?])
        }))
        .unwrap();

    let err = engine.process().unwrap_err();

    assert!(matches!(err, EngineError::Codec { ref class, .. } if class == "a/Impl"));
}

#[test]
fn config_file_controls_strictness() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "strict_declarations = true\nexpansion_cache_capacity = 4").unwrap();
    let config = EngineConfig::from_path(file.path()).unwrap();
    assert_eq!(config.expansion_cache_capacity, 4);

    let lenient = || {
        let mut engine = engine_with(&[ClassFixture::new("a/A")]);
        engine
            .register(FnTransformer::new("lonely", |_, _| Ok(Vec::new())).after("missing"))
            .unwrap();
        engine
    };

    assert!(lenient().process().is_ok());
    let err = lenient().with_config(config).process().unwrap_err();
    assert!(matches!(err, EngineError::UnknownTransformer(ref u) if u.unknown.as_str() == "missing"));
}

#[test]
fn failing_transformer_is_named() {
    let mut engine = engine_with(&[ClassFixture::new("a/A")]);
    engine
        .register(FnTransformer::new("grumpy", |_, _| {
            Err(TransformError::Failed("refusing".into()))
        }))
        .unwrap();

    let err = engine.process().unwrap_err();

    assert_eq!(err.to_string(), "transformer 'grumpy' failed: refusing");
}

proptest! {
    /// Renames of distinct fields commute with registration order.
    #[test]
    fn disjoint_renames_commute(picks in proptest::sample::subsequence(vec![0usize, 1, 2, 3, 4], 1..5)) {
        let run = |order: &[usize]| {
            let mut engine = engine_with(&[class_with_fields("a/A", &["a", "b", "c", "d", "e"])]);
            for &index in order {
                engine
                    .register(FnTransformer::new(format!("rename-{index}"), move |tree, id| {
                        Ok(vec![rename(tree, id, field(0, index), "renamed")?])
                    }))
                    .unwrap();
            }
            engine.process().unwrap()
        };
        let forward = run(&picks);
        let reversed: Vec<usize> = picks.iter().rev().copied().collect();
        let backward = run(&reversed);

        prop_assert_eq!(&forward.artifacts, &backward.artifacts);
        let names = output_fields(&forward.artifacts[0]);
        prop_assert_eq!(names.iter().filter(|n| n.as_str() == "renamed").count(), picks.len());
    }
}
