//! The expected side: oracle entries and the facets they declare.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use common::descriptor::qualify;
use common::{
    AnnotationDescriptor, AttributeDescriptor, ClassKind, ConstructorDescriptor, MethodDescriptor,
    ModifierSet,
};
use serde::Serialize;

use crate::ConfigError;

/// One checkable dimension of an oracle entry.
///
/// The declaration order is the order in which verdicts appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Kind,
    Modifiers,
    Annotations,
    Superclass,
    Interfaces,
    EnumValues,
    Attributes,
    Constructors,
    Methods,
}

impl Facet {
    pub const ALL: [Facet; 9] = [
        Facet::Kind,
        Facet::Modifiers,
        Facet::Annotations,
        Facet::Superclass,
        Facet::Interfaces,
        Facet::EnumValues,
        Facet::Attributes,
        Facet::Constructors,
        Facet::Methods,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Facet::Kind => "kind",
            Facet::Modifiers => "modifiers",
            Facet::Annotations => "annotations",
            Facet::Superclass => "superclass",
            Facet::Interfaces => "interfaces",
            Facet::EnumValues => "enum_values",
            Facet::Attributes => "attributes",
            Facet::Constructors => "constructors",
            Facet::Methods => "methods",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Facet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Facet::ALL
            .into_iter()
            .find(|f| f.name() == key || (key == "enumvalues" && *f == Facet::EnumValues))
            .ok_or_else(|| ConfigError::UnknownFacet(s.to_string()))
    }
}

/// What the oracle expects of one type.
///
/// Every facet is optional: `None` means not declared and not checked.
/// `Some(vec![])` declares the facet with nothing to find, so it passes as
/// soon as the class resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleEntry {
    pub qualified_name: String,
    pub simple_name: String,
    /// Empty for the default package.
    pub package: String,
    pub kind: Option<ClassKind>,
    pub modifiers: Option<ModifierSet>,
    pub annotations: Option<Vec<AnnotationDescriptor>>,
    /// `"Object"` expects no explicit superclass.
    pub superclass: Option<String>,
    pub interfaces: Option<Vec<String>>,
    pub enum_values: Option<Vec<String>>,
    pub attributes: Option<Vec<AttributeDescriptor>>,
    pub constructors: Option<Vec<ConstructorDescriptor>>,
    pub methods: Option<Vec<MethodDescriptor>>,
}

impl OracleEntry {
    /// An entry for `package.simple_name` with no facets declared.
    pub fn new(package: &str, simple_name: &str) -> Self {
        Self {
            qualified_name: qualify(package, simple_name),
            simple_name: simple_name.to_string(),
            package: package.to_string(),
            kind: None,
            modifiers: None,
            annotations: None,
            superclass: None,
            interfaces: None,
            enum_values: None,
            attributes: None,
            constructors: None,
            methods: None,
        }
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_modifiers<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = Some(ModifierSet::from_tokens(tokens));
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDescriptor) -> Self {
        self.annotations.get_or_insert_with(Vec::new).push(annotation);
        self
    }

    pub fn with_superclass(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interfaces
            .get_or_insert_with(Vec::new)
            .push(interface.to_string());
        self
    }

    pub fn with_enum_value(mut self, constant: &str) -> Self {
        self.enum_values
            .get_or_insert_with(Vec::new)
            .push(constant.to_string());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.get_or_insert_with(Vec::new).push(attribute);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors
            .get_or_insert_with(Vec::new)
            .push(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.get_or_insert_with(Vec::new).push(method);
        self
    }

    /// Returns `true` if the entry carries expectations for `facet`.
    pub fn declares(&self, facet: Facet) -> bool {
        match facet {
            Facet::Kind => self.kind.is_some(),
            Facet::Modifiers => self.modifiers.is_some(),
            Facet::Annotations => self.annotations.is_some(),
            Facet::Superclass => self.superclass.is_some(),
            Facet::Interfaces => self.interfaces.is_some(),
            Facet::EnumValues => self.enum_values.is_some(),
            Facet::Attributes => self.attributes.is_some(),
            Facet::Constructors => self.constructors.is_some(),
            Facet::Methods => self.methods.is_some(),
        }
    }

    /// Declared facets in report order.
    pub fn declared_facets(&self) -> Vec<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|f| self.declares(*f))
            .collect()
    }
}

/// A validated, non-empty list of oracle entries with unique class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oracle {
    entries: Vec<OracleEntry>,
}

impl Oracle {
    /// # Errors
    /// - `EmptyOracle` if `entries` is empty
    /// - `EmptyName` for an entry without a class name
    /// - `DuplicateClass` if two entries share a qualified name
    pub fn new(entries: Vec<OracleEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyOracle);
        }
        let mut seen = HashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.simple_name.trim().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !seen.insert(entry.qualified_name.as_str()) {
                return Err(ConfigError::DuplicateClass(entry.qualified_name.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[OracleEntry] {
        &self.entries
    }

    pub fn get(&self, qualified_name: &str) -> Option<&OracleEntry> {
        self.entries
            .iter()
            .find(|e| e.qualified_name == qualified_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that declare `facet`, in oracle order.
    pub fn entries_declaring(&self, facet: Facet) -> impl Iterator<Item = &OracleEntry> {
        self.entries.iter().filter(move |e| e.declares(facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_facets_in_report_order() {
        let entry = OracleEntry::new("com.example", "Foo")
            .with_method(MethodDescriptor::new("bar", &["int"], "void"))
            .with_modifiers(["public"])
            .with_kind(ClassKind::Class);
        assert_eq!(entry.qualified_name, "com.example.Foo");
        assert_eq!(
            entry.declared_facets(),
            vec![Facet::Kind, Facet::Modifiers, Facet::Methods]
        );
        assert!(!entry.declares(Facet::Attributes));
    }

    #[test]
    fn test_oracle_rejects_empty_and_duplicates() {
        assert_eq!(Oracle::new(Vec::new()), Err(ConfigError::EmptyOracle));

        let dup = vec![
            OracleEntry::new("a", "B").with_kind(ClassKind::Class),
            OracleEntry::new("a", "B").with_kind(ClassKind::Enum),
        ];
        assert_eq!(
            Oracle::new(dup),
            Err(ConfigError::DuplicateClass("a.B".into()))
        );

        let unnamed = vec![OracleEntry::new("a", " ")];
        assert_eq!(Oracle::new(unnamed), Err(ConfigError::EmptyName(0)));
    }

    #[test]
    fn test_same_simple_name_in_different_packages() {
        let entries = vec![OracleEntry::new("a", "Node"), OracleEntry::new("b", "Node")];
        let oracle = Oracle::new(entries).unwrap();
        assert_eq!(oracle.len(), 2);
        assert!(oracle.get("b.Node").is_some());
    }

    #[test]
    fn test_facet_parse() {
        assert_eq!("Methods".parse::<Facet>().unwrap(), Facet::Methods);
        assert_eq!("enum-values".parse::<Facet>().unwrap(), Facet::EnumValues);
        assert_eq!("enumValues".parse::<Facet>().unwrap(), Facet::EnumValues);
        assert!(matches!("fields".parse::<Facet>(), Err(ConfigError::UnknownFacet(_))));
    }
}
