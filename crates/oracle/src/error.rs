use crate::entry::Facet;

/// A defect in the oracle or in how verification was invoked.
///
/// These are never structural findings about the candidate; those are
/// [`crate::Discrepancy`] values inside the report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("The oracle declares no entries")]
    EmptyOracle,

    #[error("Oracle entry #{0} has an empty class name")]
    EmptyName(usize),

    #[error("The oracle declares {0} more than once")]
    DuplicateClass(String),

    #[error("No oracle entry declares the {0} facet")]
    NoEntriesForFacet(Facet),

    #[error("Unknown facet: {0:?}")]
    UnknownFacet(String),

    #[error("Unknown annotation mode: {0:?} (expected \"equal\" or \"contains\")")]
    UnknownAnnotationMode(String),
}
