//! # Descriptors: The Shared Structural Vocabulary
//!
//! Value objects describing one structural fact about a type: the type itself,
//! its methods, attributes (fields) and constructors, plus the modifier and
//! annotation sets attached to each of them.
//!
//! The same descriptors are used on both sides of a comparison: the oracle
//! (what a submission must declare) and the introspected candidate (what it
//! actually declares). They carry no identity beyond structural equality.
//!
//! All type names are compared through [`simple_type_name`], which mirrors the
//! simple name of an erased JVM type (`java.util.List<String>` → `List`).

use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

use crate::ClassKind;

/// Builds a qualified name from a package and a simple name.
///
/// # Examples
/// ```
/// # use common::descriptor::qualify;
/// assert_eq!(qualify("com.example", "Foo"), "com.example.Foo");
/// assert_eq!(qualify("", "Foo"), "Foo");
/// ```
pub fn qualify(package: &str, simple_name: &str) -> String {
    if package.is_empty() {
        simple_name.to_string()
    } else {
        format!("{package}.{simple_name}")
    }
}

/// Reduces a declared type to the simple name of its erasure.
///
/// Package qualifiers and generic arguments are dropped, array dimensions are
/// kept, and varargs (`T...`) count as one array dimension. Type-use
/// annotations at the top level are ignored.
///
/// # Examples
/// ```
/// # use common::descriptor::simple_type_name;
/// assert_eq!(simple_type_name("java.util.Map<String, List<Integer>>"), "Map");
/// assert_eq!(simple_type_name("int[][]"), "int[][]");
/// assert_eq!(simple_type_name("String..."), "String[]");
/// assert_eq!(simple_type_name("Map.Entry<K, V>"), "Entry");
/// ```
pub fn simple_type_name(raw: &str) -> String {
    let mut base = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for token in raw.split_whitespace().filter(|t| !t.starts_with('@')) {
        for ch in token.chars() {
            match ch {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                c if depth == 0 => base.push(c),
                _ => {}
            }
        }
    }

    let mut dims = 0usize;
    let mut rest = base.as_str();
    loop {
        if let Some(stripped) = rest.strip_suffix("[]") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_suffix("...") {
            rest = stripped;
        } else {
            break;
        }
        dims += 1;
    }

    let simple = rest.rsplit('.').next().unwrap_or(rest);
    format!("{simple}{}", "[]".repeat(dims))
}

/// Returns `true` when both declared types erase to the same simple name.
pub fn types_match(expected: &str, observed: &str) -> bool {
    simple_type_name(expected) == simple_type_name(observed)
}

/// Positional parameter lists are equal when arity and every slot match.
pub fn parameters_match(expected: &[String], observed: &[String]) -> bool {
    expected.len() == observed.len()
        && expected
            .iter()
            .zip(observed)
            .all(|(e, o)| types_match(e, o))
}

/// Unordered set of lower-cased modifier tokens (`public`, `static`, `final`, ...).
///
/// Tokens are normalized on construction: trimmed, lower-cased, de-duplicated
/// and sorted. Empty tokens are dropped, so a member without modifiers is the
/// empty set.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ModifierSet {
    tokens: Vec<String>,
}

impl ModifierSet {
    /// Creates an empty modifier set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized set from arbitrary tokens.
    ///
    /// # Examples
    /// ```
    /// # use common::descriptor::ModifierSet;
    /// let a = ModifierSet::from_tokens(["Static", "public", ""]);
    /// let b = ModifierSet::from_tokens(["public", "static"]);
    /// assert_eq!(a, b);
    /// assert_eq!(a.len(), 2);
    /// ```
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort();
        tokens.dedup();
        Self { tokens }
    }

    /// Adds a token, keeping the set normalized.
    pub fn insert(&mut self, token: &str) {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            return;
        }
        if let Err(idx) = self.tokens.binary_search(&token) {
            self.tokens.insert(idx, token);
        }
    }

    /// Removes a token; returns `true` if it was present.
    pub fn remove(&mut self, token: &str) -> bool {
        match self.tokens.binary_search(&token.trim().to_ascii_lowercase()) {
            Ok(idx) => {
                self.tokens.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns `true` if the (case-insensitive) token is in the set.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens
            .binary_search(&token.trim().to_ascii_lowercase())
            .is_ok()
    }

    /// Tokens of `self` that `other` lacks, in sorted order.
    pub fn difference(&self, other: &ModifierSet) -> Vec<String> {
        self.tokens
            .iter()
            .filter(|t| other.tokens.binary_search(t).is_err())
            .cloned()
            .collect()
    }

    /// Sorted tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<String>> for ModifierSet {
    fn from(tokens: Vec<String>) -> Self {
        Self::from_tokens(tokens)
    }
}

impl From<ModifierSet> for Vec<String> {
    fn from(set: ModifierSet) -> Self {
        set.tokens
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tokens.join(", "))
    }
}

/// One `key = value` element of an annotation.
#[derive(
    Debug,
    Clone,
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
pub struct AnnotationAttribute {
    pub key: String,
    pub value: String,
}

/// An annotation by simple type name, optionally with element values.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct AnnotationDescriptor {
    /// Simple annotation type name without `@` (e.g. `"Deprecated"`).
    pub type_name: String,
    /// Element values sorted by key.
    pub attributes: Vec<AnnotationAttribute>,
}

impl AnnotationDescriptor {
    /// Creates an annotation descriptor; `@` prefixes and package qualifiers are stripped.
    ///
    /// # Examples
    /// ```
    /// # use common::descriptor::AnnotationDescriptor;
    /// let a = AnnotationDescriptor::new("@java.lang.Deprecated");
    /// assert_eq!(a.type_name, "Deprecated");
    /// ```
    pub fn new(type_name: &str) -> Self {
        let trimmed = type_name.trim().trim_start_matches('@');
        let simple = trimmed.rsplit('.').next().unwrap_or(trimmed);
        Self {
            type_name: simple.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Adds (or replaces) an element value. Surrounding quotes are removed.
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        let attribute = AnnotationAttribute {
            key: key.trim().to_string(),
            value: value.to_string(),
        };
        match self
            .attributes
            .binary_search_by(|a| a.key.as_str().cmp(&attribute.key))
        {
            Ok(idx) => self.attributes[idx] = attribute,
            Err(idx) => self.attributes.insert(idx, attribute),
        }
        self
    }

    /// Value of the element named `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

impl fmt::Display for AnnotationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name)?;
        if !self.attributes.is_empty() {
            let pairs: Vec<String> = self
                .attributes
                .iter()
                .map(|a| format!("{}={}", a.key, a.value))
                .collect();
            write!(f, "({})", pairs.join(", "))?;
        }
        Ok(())
    }
}

/// Renders a parameter list as `(int, String[])`.
pub fn render_parameters(parameters: &[String]) -> String {
    format!("({})", parameters.join(", "))
}

/// A declared method. Overload identity is `(name, parameters)`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct MethodDescriptor {
    pub name: String,
    /// Parameter types in declaration order.
    pub parameters: Vec<String>,
    pub return_type: String,
    pub modifiers: ModifierSet,
    pub annotations: Vec<AnnotationDescriptor>,
}

impl MethodDescriptor {
    pub fn new(name: &str, parameters: &[&str], return_type: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.to_string(),
            modifiers: ModifierSet::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = ModifierSet::from_tokens(tokens);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDescriptor) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Human readable signature, e.g. `bar(int, String)`.
    ///
    /// # Examples
    /// ```
    /// # use common::descriptor::MethodDescriptor;
    /// let m = MethodDescriptor::new("bar", &["int", "String"], "void");
    /// assert_eq!(m.signature(), "bar(int, String)");
    /// ```
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, render_parameters(&self.parameters))
    }
}

/// A declared constructor, identified by its parameter signature alone.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct ConstructorDescriptor {
    /// Simple name of the owning type.
    pub class_name: String,
    pub parameters: Vec<String>,
    pub modifiers: ModifierSet,
    pub annotations: Vec<AnnotationDescriptor>,
}

impl ConstructorDescriptor {
    pub fn new(class_name: &str, parameters: &[&str]) -> Self {
        Self {
            class_name: class_name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            modifiers: ModifierSet::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = ModifierSet::from_tokens(tokens);
        self
    }

    pub fn signature(&self) -> String {
        format!("{}{}", self.class_name, render_parameters(&self.parameters))
    }
}

/// A declared field.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct AttributeDescriptor {
    pub name: String,
    pub type_name: String,
    pub modifiers: ModifierSet,
    pub annotations: Vec<AnnotationDescriptor>,
}

impl AttributeDescriptor {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            modifiers: ModifierSet::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = ModifierSet::from_tokens(tokens);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDescriptor) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// The declared structure of one type (class, interface, enum or record).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Archive,
    Deserialize,
    Serialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct ClassDescriptor {
    /// `package.Outer.Inner` for nested types, `Name` in the default package.
    pub qualified_name: String,
    pub simple_name: String,
    /// Empty for the default package.
    pub package: String,
    pub kind: ClassKind,
    pub modifiers: ModifierSet,
    pub annotations: Vec<AnnotationDescriptor>,
    /// Declared superclass (as written or resolved), `None` when implicit.
    pub superclass: Option<String>,
    /// Implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<String>,
    /// Enum constant names in declaration order; empty for non-enums.
    pub enum_values: Vec<String>,
    pub methods: Vec<MethodDescriptor>,
    pub attributes: Vec<AttributeDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
    /// Normalized path of the declaring source file; empty if unknown.
    pub source_path: String,
}

impl ClassDescriptor {
    /// Creates an empty descriptor for `package.simple_name`.
    pub fn new(package: &str, simple_name: &str, kind: ClassKind) -> Self {
        Self {
            qualified_name: qualify(package, simple_name),
            simple_name: simple_name.to_string(),
            package: package.to_string(),
            kind,
            modifiers: ModifierSet::new(),
            annotations: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            enum_values: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            constructors: Vec::new(),
            source_path: String::new(),
        }
    }

    pub fn with_modifiers<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = ModifierSet::from_tokens(tokens);
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_superclass(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Declared methods named `name` (all overloads).
    pub fn methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MethodDescriptor> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}
