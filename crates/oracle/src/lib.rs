//! # Oracle: Structural Verification Engine
//!
//! Compares an *expected* structure (the [`Oracle`], usually loaded from a
//! JSON file by [`loader`]) with the *observed* structure of a candidate
//! program, read through [`common::StructureIntrospectable`].
//!
//! ## Flow
//! 1. **Resolve**: each [`OracleEntry`] is looked up by exact qualified name
//!    and package ([`resolver`]). A missing class is a verdict, not an error.
//! 2. **Match**: every facet the entry declares (kind, modifiers, methods,
//!    ...) is checked independently by a pure matcher ([`matchers`]).
//! 3. **Report**: verdicts are collected into a [`VerificationReport`] keyed
//!    by qualified name, so serialized output is deterministic.
//!
//! Structural mismatches are [`Discrepancy`] values. [`ConfigError`] is
//! reserved for defects in the oracle itself.

pub mod entry;
pub mod error;
pub mod loader;
pub mod matchers;
pub mod policy;
pub mod redact;
pub mod report;
pub mod resolver;
pub mod verifier;

pub use entry::{Facet, Oracle, OracleEntry};
pub use error::ConfigError;
pub use loader::{load_path, load_str, LoaderError};
pub use policy::{AnnotationMode, MatchPolicy};
pub use redact::{PassThrough, PrefixRedactor, Redactor};
pub use report::{
    Discrepancy, EntryOutcome, EntryReport, FacetVerdict, Mismatch, ReportSummary,
    VerificationReport,
};
pub use resolver::Resolution;
pub use verifier::{CheckUnit, OracleVerifier, Phase};
