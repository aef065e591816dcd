//! Reads an oracle from its JSON file format.
//!
//! The file is an array of objects, one per expected class:
//!
//! ```json
//! [{
//!   "class": { "name": "Foo", "package": "com.example", "modifiers": ["public"] },
//!   "methods": [
//!     { "name": "bar", "parameters": ["int"], "modifiers": ["public"], "returnType": "void" }
//!   ],
//!   "attributes": [{ "name": "size", "type": "int", "modifiers": ["private"] }],
//!   "constructors": [{ "parameters": [], "modifiers": ["public"] }],
//!   "enumValues": ["RED"]
//! }]
//! ```
//!
//! Omitted top-level keys leave their facet undeclared. Inside a member,
//! omitted `parameters`, `modifiers` and `annotations` mean "none", so they
//! are still checked.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use common::{
    AnnotationDescriptor, AttributeDescriptor, ClassKind, ConstructorDescriptor, MethodDescriptor,
    ModifierSet,
};
use serde::Deserialize;
use thiserror::Error;

use crate::entry::{Oracle, OracleEntry};
use crate::error::ConfigError;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to read oracle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed oracle JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid oracle: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    class: WireClass,
    methods: Option<Vec<WireMethod>>,
    attributes: Option<Vec<WireAttribute>>,
    constructors: Option<Vec<WireConstructor>>,
    enum_values: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClass {
    name: String,
    #[serde(default)]
    package: String,
    modifiers: Option<Vec<String>>,
    annotations: Option<Vec<WireAnnotation>>,
    superclass: Option<String>,
    interfaces: Option<Vec<String>>,
    #[serde(default)]
    is_interface: bool,
    #[serde(default)]
    is_enum: bool,
    #[serde(default)]
    is_record: bool,
    kind: Option<ClassKind>,
}

impl WireClass {
    /// An explicit `kind` wins over the boolean flags.
    fn kind(&self) -> Option<ClassKind> {
        self.kind.or(if self.is_interface {
            Some(ClassKind::Interface)
        } else if self.is_enum {
            Some(ClassKind::Enum)
        } else if self.is_record {
            Some(ClassKind::Record)
        } else {
            None
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAnnotation {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        attributes: BTreeMap<String, serde_json::Value>,
    },
}

impl From<WireAnnotation> for AnnotationDescriptor {
    fn from(wire: WireAnnotation) -> Self {
        match wire {
            WireAnnotation::Name(name) => AnnotationDescriptor::new(&name),
            WireAnnotation::Full { name, attributes } => {
                attributes
                    .into_iter()
                    .fold(AnnotationDescriptor::new(&name), |acc, (key, value)| {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        acc.with_attribute(&key, &value)
                    })
            }
        }
    }
}

fn annotations(wire: Vec<WireAnnotation>) -> Vec<AnnotationDescriptor> {
    wire.into_iter().map(AnnotationDescriptor::from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMethod {
    name: String,
    #[serde(default)]
    parameters: Vec<String>,
    #[serde(default)]
    modifiers: Vec<String>,
    #[serde(default)]
    annotations: Vec<WireAnnotation>,
    return_type: String,
}

#[derive(Debug, Deserialize)]
struct WireAttribute {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    modifiers: Vec<String>,
    #[serde(default)]
    annotations: Vec<WireAnnotation>,
}

#[derive(Debug, Deserialize)]
struct WireConstructor {
    #[serde(default)]
    parameters: Vec<String>,
    #[serde(default)]
    modifiers: Vec<String>,
    #[serde(default)]
    annotations: Vec<WireAnnotation>,
}

impl WireEntry {
    fn into_entry(self) -> OracleEntry {
        let WireEntry {
            class,
            methods,
            attributes,
            constructors,
            enum_values,
        } = self;
        let simple_name = class.name.trim().to_string();
        let mut entry = OracleEntry::new(class.package.trim(), &simple_name);
        entry.kind = class.kind();
        entry.modifiers = class.modifiers.map(ModifierSet::from_tokens);
        entry.annotations = class.annotations.map(annotations);
        entry.superclass = class.superclass;
        entry.interfaces = class.interfaces;
        entry.enum_values = enum_values;

        entry.methods = methods.map(|methods| {
            methods
                .into_iter()
                .map(|m| MethodDescriptor {
                    name: m.name,
                    parameters: m.parameters,
                    return_type: m.return_type,
                    modifiers: ModifierSet::from_tokens(m.modifiers),
                    annotations: annotations(m.annotations),
                })
                .collect()
        });
        entry.attributes = attributes.map(|attributes| {
            attributes
                .into_iter()
                .map(|a| AttributeDescriptor {
                    name: a.name,
                    type_name: a.type_name,
                    modifiers: ModifierSet::from_tokens(a.modifiers),
                    annotations: annotations(a.annotations),
                })
                .collect()
        });
        entry.constructors = constructors.map(|constructors| {
            constructors
                .into_iter()
                .map(|c| ConstructorDescriptor {
                    class_name: simple_name.clone(),
                    parameters: c.parameters,
                    modifiers: ModifierSet::from_tokens(c.modifiers),
                    annotations: annotations(c.annotations),
                })
                .collect()
        });
        entry
    }
}

/// Parses and validates an oracle from JSON text.
pub fn load_str(json: &str) -> Result<Oracle, LoaderError> {
    let wire: Vec<WireEntry> = serde_json::from_str(json)?;
    let oracle = Oracle::new(wire.into_iter().map(WireEntry::into_entry).collect())?;
    tracing::debug!(entries = oracle.len(), "oracle parsed");
    Ok(oracle)
}

/// Reads and validates an oracle file.
pub fn load_path(path: &Path) -> Result<Oracle, LoaderError> {
    let json = fs::read_to_string(path)?;
    let oracle = load_str(&json)?;
    tracing::info!(path = %path.display(), entries = oracle.len(), "oracle loaded");
    Ok(oracle)
}
