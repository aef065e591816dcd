//! # Common: The Type Descriptor Model
//!
//! Shared vocabulary for "expected" and "observed" program structure:
//! [`ClassDescriptor`] and its nested method, attribute and constructor
//! descriptors, plus the [`StructureIntrospectable`] capability through which
//! the verifier reads a candidate program.
//!
//! Descriptors derive `rkyv` traits so an introspected candidate can be
//! persisted as a [`snapshot::StructureSnapshot`] and re-read via mmap, and
//! `serde` traits so they can travel inside JSON reports.

pub mod descriptor;
pub mod snapshot;

pub use descriptor::{
    AnnotationAttribute, AnnotationDescriptor, AttributeDescriptor, ClassDescriptor,
    ConstructorDescriptor, MethodDescriptor, ModifierSet,
};

use rkyv::{Archive, Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The four kinds of type declaration the oracle can describe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ClassKind {
    Class = 0,
    Interface = 1,
    Enum = 2,
    Record = 3,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::Record => "record",
        };
        f.write_str(s)
    }
}

/// Read access to the declared structure of a compiled or parsed candidate program.
///
/// Implementations must be pure lookups: the verifier may call them from
/// several worker threads at once.
pub trait StructureIntrospectable: Send + Sync {
    /// Returns the declared structure of the type whose qualified name is
    /// exactly `qualified_name` (case-sensitive), or `None`.
    fn introspect(&self, qualified_name: &str) -> Option<Cow<'_, ClassDescriptor>>;

    /// Qualified names of every type the program declares, sorted.
    fn type_names(&self) -> Vec<String>;
}
