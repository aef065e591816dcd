use std::str::FromStr;

use serde::Serialize;

use crate::ConfigError;

/// How observed annotations are compared to the expected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationMode {
    /// The observed annotation names must equal the expected set.
    #[default]
    Equal,
    /// Every expected annotation must be present; extras are allowed.
    Contains,
}

impl FromStr for AnnotationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "equals" | "exact" => Ok(AnnotationMode::Equal),
            "contains" | "subset" => Ok(AnnotationMode::Contains),
            _ => Err(ConfigError::UnknownAnnotationMode(s.to_string())),
        }
    }
}

/// Strictness knobs for the facet matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatchPolicy {
    pub annotation_mode: AnnotationMode,
    /// Also require every key/value pair given on an expected annotation.
    pub compare_annotation_attributes: bool,
    /// Let non-private members of in-program superclasses satisfy method
    /// and attribute expectations.
    pub include_inherited: bool,
}

impl MatchPolicy {
    /// Exact annotation sets including element values.
    pub fn strict() -> Self {
        Self {
            annotation_mode: AnnotationMode::Equal,
            compare_annotation_attributes: true,
            include_inherited: false,
        }
    }

    pub fn with_annotation_mode(mut self, mode: AnnotationMode) -> Self {
        self.annotation_mode = mode;
        self
    }

    pub fn with_annotation_attributes(mut self, compare: bool) -> Self {
        self.compare_annotation_attributes = compare;
        self
    }

    pub fn with_inherited(mut self, include: bool) -> Self {
        self.include_inherited = include;
        self
    }
}
