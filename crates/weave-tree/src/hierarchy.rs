//! Class hierarchy oracle
//!
//! [`ClassHierarchy`] answers superclass, interface and assignability
//! questions. [`BatchHierarchy`] answers from the classes currently in the
//! tree and defers to an external oracle for everything else (library
//! classes).

use crate::class::ClassHeader;
use crate::error::TreeError;
use crate::tree::Tree;
use std::collections::{HashMap, HashSet, VecDeque};

/// Name of the implicit root class
pub const OBJECT: &str = "java/lang/Object";

/// What the hierarchy knows about one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub super_name: Option<String>,
    pub is_interface: bool,
    pub interfaces: Vec<String>,
}

impl ClassInfo {
    /// A plain class
    #[must_use]
    pub fn class(name: impl Into<String>, super_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            super_name: super_name.map(str::to_string),
            is_interface: false,
            interfaces: Vec::new(),
        }
    }

    /// An interface (its superclass is `java/lang/Object`)
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: Some(OBJECT.to_string()),
            is_interface: true,
            interfaces: Vec::new(),
        }
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

impl From<&ClassHeader> for ClassInfo {
    fn from(header: &ClassHeader) -> Self {
        Self {
            name: header.name.clone(),
            super_name: header.super_name.clone(),
            is_interface: header.kind.is_interface(),
            interfaces: header.interfaces.clone(),
        }
    }
}

/// Pure, deterministic class hierarchy queries
pub trait ClassHierarchy: Send + Sync {
    /// Everything known about `name`
    fn lookup(&self, name: &str) -> Option<ClassInfo>;

    /// Superclass of `name`
    fn super_name(&self, name: &str) -> Option<String> {
        self.lookup(name).and_then(|info| info.super_name)
    }

    /// Whether `name` is an interface (unknown classes are not)
    fn is_interface(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|info| info.is_interface)
    }

    /// Whether a value of type `from` can be stored in a `to`
    ///
    /// Walks superclasses and interfaces of `from`. Unknown classes end the
    /// walk.
    fn is_assignable(&self, to: &str, from: &str) -> bool {
        if to == from || to == OBJECT {
            return true;
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.lookup(&current) else {
                continue;
            };
            for parent in info.super_name.into_iter().chain(info.interfaces) {
                if parent == to {
                    return true;
                }
                queue.push_back(parent);
            }
        }
        false
    }

    /// Closest common superclass, as class writers need for stack frames
    fn common_super(&self, a: &str, b: &str) -> String {
        if self.is_assignable(a, b) {
            return a.to_string();
        }
        if self.is_assignable(b, a) {
            return b.to_string();
        }
        if self.is_interface(a) || self.is_interface(b) {
            return OBJECT.to_string();
        }

        let mut seen = HashSet::new();
        let mut current = self.super_name(a);
        while let Some(candidate) = current {
            if !seen.insert(candidate.clone()) {
                break;
            }
            if self.is_assignable(&candidate, b) {
                return candidate;
            }
            current = self.super_name(&candidate);
        }
        OBJECT.to_string()
    }
}

/// Knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHierarchy;

impl ClassHierarchy for EmptyHierarchy {
    fn lookup(&self, _name: &str) -> Option<ClassInfo> {
        None
    }
}

/// Precomputed hierarchy, e.g. from library class headers
#[derive(Debug, Clone, Default)]
pub struct MapHierarchy {
    classes: HashMap<String, ClassInfo>,
}

impl MapHierarchy {
    /// Empty hierarchy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class
    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, info: ClassInfo) -> Self {
        self.insert(info);
        self
    }

    /// Number of known classes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// No known classes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassHierarchy for MapHierarchy {
    fn lookup(&self, name: &str) -> Option<ClassInfo> {
        self.classes.get(name).cloned()
    }
}

/// Hierarchy of the classes in a tree, backed by an external oracle
///
/// Classes of the batch shadow the fallback, so a transformation that
/// changes a superclass is visible to the encoder.
pub struct BatchHierarchy<'a> {
    local: MapHierarchy,
    fallback: &'a dyn ClassHierarchy,
}

impl<'a> BatchHierarchy<'a> {
    /// Snapshot the headers of every class in `tree`
    ///
    /// # Errors
    /// Returns error if a written class no longer has a readable header
    pub fn from_tree(tree: &Tree, fallback: &'a dyn ClassHierarchy) -> Result<Self, TreeError> {
        let mut local = MapHierarchy::new();
        for index in 0..tree.class_count() {
            let header = tree.class_header(index)?;
            local.insert(ClassInfo::from(&header));
        }
        Ok(Self { local, fallback })
    }

    /// Number of classes known from the batch
    #[inline]
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}

impl ClassHierarchy for BatchHierarchy<'_> {
    fn lookup(&self, name: &str) -> Option<ClassInfo> {
        self.local.lookup(name).or_else(|| self.fallback.lookup(name))
    }
}

impl std::fmt::Debug for BatchHierarchy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHierarchy")
            .field("local", &self.local.len())
            .finish_non_exhaustive()
    }
}
