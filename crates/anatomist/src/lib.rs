//! # The Anatomist: Java CST Parsing, Introspection & Node Classification
//!
//! **Role**: Turns candidate Java sources into the observed side of a
//! structural comparison, and answers "is this syntactic construct present?"
//! questions over the same trees.
//!
//! **Core Types**:
//! - [`ParserHost`] / [`SourceTree`]: tree-sitter Java parsing with owned source bytes.
//! - [`introspect`]: extracts [`common::ClassDescriptor`]s the way runtime reflection
//!   would report them (erased simple type names, implicit modifiers and members).
//! - [`CandidateProgram`]: every type declared under a source root; implements
//!   [`common::StructureIntrospectable`].
//! - [`classifier`]: the node-kind category registry and presence queries.
//!
//! **Design**:
//! - Classification is purely grammatical: node kinds plus their structural
//!   position, never text patterns over source.
//! - Tree-sitter error recovery is relied upon; files with syntax errors still
//!   yield whatever structure can be recovered (logged at `warn`).

pub mod classifier;
pub mod introspect;
pub mod parser;
pub mod path_util;
pub mod program;

pub use classifier::{
    CategoryPresence, CategoryRegistry, ClassifierError, NodeClassifier, NodeKindCategory,
    NodeShape, Occurrence, Position, PresenceReport, ScanMode, Scope,
};
pub use parser::{ParserHost, SourceTree};
pub use program::CandidateProgram;

/// Errors produced by the Anatomist crate.
#[derive(Debug, thiserror::Error)]
pub enum AnatomistError {
    /// Tree-sitter parsing failed.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Byte range exceeds u32::MAX (file too large).
    #[error("Byte range overflow: file size exceeds 4GB limit")]
    ByteRangeOverflow,

    /// Directory traversal failed.
    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}
