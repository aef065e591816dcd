//! The candidate program: every type declared under a source root.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use common::snapshot::StructureSnapshot;
use common::{ClassDescriptor, StructureIntrospectable};

use crate::introspect::extract_types;
use crate::path_util::{java_sources, relative_display};
use crate::{AnatomistError, ParserHost, SourceTree};

/// Declared structure of a parsed candidate, keyed by qualified name.
///
/// When two files declare the same qualified name the first one loaded wins
/// and the duplicate is logged; a compiler would reject the program, but the
/// remaining types are still worth grading.
#[derive(Debug, Default, Clone)]
pub struct CandidateProgram {
    types: BTreeMap<String, ClassDescriptor>,
}

impl CandidateProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `.java` file under `root` (sorted, so loading is
    /// deterministic) and collects the types they declare. Source paths are
    /// recorded relative to `root`.
    ///
    /// # Errors
    /// Fails if the directory cannot be walked or a file cannot be read.
    /// Syntax errors are not fatal.
    pub fn load_dir(root: &Path) -> Result<Self, AnatomistError> {
        let mut host = ParserHost::new()?;
        let mut program = Self::new();
        let files = java_sources(root)?;
        for file in &files {
            let tree = host.parse_file(file)?;
            let source_path = relative_display(root, file);
            for mut class in extract_types(&tree) {
                class.source_path = source_path.clone();
                program.insert(class);
            }
        }
        tracing::info!(
            root = %root.display(),
            files = files.len(),
            types = program.len(),
            "candidate program loaded"
        );
        Ok(program)
    }

    /// Parses one in-memory compilation unit and adds its types.
    pub fn add_source(&mut self, source: &str, label: &str) -> Result<(), AnatomistError> {
        let mut host = ParserHost::new()?;
        let tree = host.parse(source.as_bytes(), label)?;
        self.add_tree(&tree);
        Ok(())
    }

    /// Adds every type declared in an already parsed tree.
    pub fn add_tree(&mut self, tree: &SourceTree) {
        for class in extract_types(tree) {
            self.insert(class);
        }
    }

    /// Inserts a descriptor; returns `false` if the name was already taken.
    pub fn insert(&mut self, class: ClassDescriptor) -> bool {
        if let Some(existing) = self.types.get(&class.qualified_name) {
            tracing::warn!(
                class = %class.qualified_name,
                kept = %existing.source_path,
                ignored = %class.source_path,
                "duplicate type declaration"
            );
            return false;
        }
        self.types.insert(class.qualified_name.clone(), class);
        true
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ClassDescriptor> {
        self.types.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.types.values()
    }

    /// Freezes the program into a persistable snapshot.
    pub fn to_snapshot(&self) -> StructureSnapshot {
        StructureSnapshot::from_classes(self.types.values().cloned())
    }
}

impl StructureIntrospectable for CandidateProgram {
    fn introspect(&self, qualified_name: &str) -> Option<Cow<'_, ClassDescriptor>> {
        self.types.get(qualified_name).map(Cow::Borrowed)
    }

    fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}
