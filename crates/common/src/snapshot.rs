//! # Structure Snapshot: Disk-Backed Candidate Structure
//!
//! Persists the introspected structure of a candidate program via `rkyv`
//! zero-copy serialization so that it can be verified again without
//! re-parsing the sources. Entries are kept sorted by qualified name, which
//! makes lookups on the memory-mapped archive a binary search.

use crate::descriptor::ArchivedClassDescriptor;
use crate::{ClassDescriptor, StructureIntrospectable};
use memmap2::Mmap;
use rkyv::{Archive, Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Errors from snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    ArchiveError(String),
}

/// In-memory snapshot of every type a candidate program declares.
#[derive(Debug, Clone, Default, Archive, Deserialize, Serialize)]
#[rkyv(derive(Debug))]
pub struct StructureSnapshot {
    /// Sorted by `qualified_name`, unique.
    classes: Vec<ClassDescriptor>,
}

impl StructureSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from arbitrary descriptors. Later duplicates replace earlier ones.
    pub fn from_classes<I>(classes: I) -> Self
    where
        I: IntoIterator<Item = ClassDescriptor>,
    {
        let mut snapshot = Self::new();
        for class in classes {
            snapshot.insert(class);
        }
        snapshot
    }

    /// Inserts a descriptor, replacing any descriptor with the same qualified name.
    pub fn insert(&mut self, class: ClassDescriptor) {
        match self
            .classes
            .binary_search_by(|c| c.qualified_name.cmp(&class.qualified_name))
        {
            Ok(idx) => self.classes[idx] = class,
            Err(idx) => self.classes.insert(idx, class),
        }
    }

    /// Looks up a descriptor by exact qualified name.
    pub fn get(&self, qualified_name: &str) -> Option<&ClassDescriptor> {
        self.classes
            .binary_search_by(|c| c.qualified_name.as_str().cmp(qualified_name))
            .ok()
            .map(|idx| &self.classes[idx])
    }

    pub fn classes(&self) -> &[ClassDescriptor] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Serializes the snapshot to bytes using `rkyv`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let aligned = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| SnapshotError::ArchiveError(e.to_string()))?;
        Ok(aligned.to_vec())
    }

    /// Saves the snapshot to a file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

impl StructureIntrospectable for StructureSnapshot {
    fn introspect(&self, qualified_name: &str) -> Option<Cow<'_, ClassDescriptor>> {
        self.get(qualified_name).map(Cow::Borrowed)
    }

    fn type_names(&self) -> Vec<String> {
        self.classes
            .iter()
            .map(|c| c.qualified_name.clone())
            .collect()
    }
}

/// Memory-mapped read-only snapshot handle.
pub struct MappedSnapshot {
    mmap: Mmap,
}

impl MappedSnapshot {
    /// Opens a snapshot file via mmap and validates the archive.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        rkyv::access::<ArchivedStructureSnapshot, rkyv::rancor::Error>(&mmap)
            .map_err(|e| SnapshotError::ArchiveError(e.to_string()))?;

        Ok(Self { mmap })
    }

    /// Returns a reference to the archived snapshot (zero-copy).
    pub fn archived(&self) -> &ArchivedStructureSnapshot {
        // SAFETY: the archive was validated in `open()` and the mmap lives as long as `self`.
        unsafe { rkyv::access_unchecked::<ArchivedStructureSnapshot>(&self.mmap[..]) }
    }

    /// Finds an archived descriptor by qualified name (binary search).
    pub fn find(&self, qualified_name: &str) -> Option<&ArchivedClassDescriptor> {
        let classes = &self.archived().classes;
        let idx = classes
            .binary_search_by(|c| c.qualified_name.as_str().cmp(qualified_name))
            .ok()?;
        Some(&classes[idx])
    }

    /// Deserializes the descriptor for `qualified_name`, if archived.
    pub fn load(&self, qualified_name: &str) -> Result<Option<ClassDescriptor>, SnapshotError> {
        let Some(archived) = self.find(qualified_name) else {
            return Ok(None);
        };
        rkyv::deserialize::<ClassDescriptor, rkyv::rancor::Error>(archived)
            .map(Some)
            .map_err(|e| SnapshotError::ArchiveError(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.archived().classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archived().classes.is_empty()
    }
}

impl StructureIntrospectable for MappedSnapshot {
    fn introspect(&self, qualified_name: &str) -> Option<Cow<'_, ClassDescriptor>> {
        match self.load(qualified_name) {
            Ok(found) => found.map(Cow::Owned),
            Err(e) => {
                tracing::warn!(class = qualified_name, error = %e, "corrupt snapshot entry");
                None
            }
        }
    }

    fn type_names(&self) -> Vec<String> {
        self.archived()
            .classes
            .iter()
            .map(|c| c.qualified_name.as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassKind, MethodDescriptor};

    fn sample() -> StructureSnapshot {
        StructureSnapshot::from_classes([
            ClassDescriptor::new("com.example", "Zeta", ClassKind::Class),
            ClassDescriptor::new("com.example", "Foo", ClassKind::Class)
                .with_modifiers(["public"])
                .with_method(
                    MethodDescriptor::new("bar", &["int"], "void").with_modifiers(["public"]),
                ),
            ClassDescriptor::new("", "Alpha", ClassKind::Record),
        ])
    }

    #[test]
    fn test_snapshot_sorted_and_unique() {
        let mut snapshot = sample();
        snapshot.insert(ClassDescriptor::new("com.example", "Foo", ClassKind::Interface));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.type_names(),
            vec!["Alpha", "com.example.Foo", "com.example.Zeta"]
        );
        assert_eq!(
            snapshot.get("com.example.Foo").map(|c| c.kind),
            Some(ClassKind::Interface)
        );
    }

    #[test]
    fn test_snapshot_lookup_is_exact() {
        let snapshot = sample();
        assert!(snapshot.introspect("com.example.Foo").is_some());
        assert!(snapshot.introspect("com.example.foo").is_none());
        assert!(snapshot.introspect("Foo").is_none());
    }

    #[test]
    fn test_archive_roundtrip() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        let archived =
            rkyv::access::<ArchivedStructureSnapshot, rkyv::rancor::Error>(&bytes).unwrap();
        assert_eq!(archived.classes.len(), 3);
        assert_eq!(archived.classes[1].qualified_name.as_str(), "com.example.Foo");
    }

    #[test]
    fn test_save_and_mmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("structure.rkyv");
        sample().save(&path).unwrap();

        let mapped = MappedSnapshot::open(&path).unwrap();
        assert_eq!(mapped.len(), 3);
        assert!(mapped.find("com.example.Missing").is_none());

        let foo = mapped.introspect("com.example.Foo").unwrap();
        assert_eq!(foo.methods.len(), 1);
        assert_eq!(foo.methods[0].signature(), "bar(int)");
        assert!(foo.modifiers.contains("public"));
    }

    #[test]
    fn test_find_returns_archived_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structure.rkyv");
        sample().save(&path).unwrap();
        let mapped = MappedSnapshot::open(&path).unwrap();

        let found: Option<&ArchivedClassDescriptor> = mapped.find("Alpha");
        let alpha = found.unwrap();
        assert_eq!(alpha.simple_name.as_str(), "Alpha");
        assert_eq!(alpha.package.as_str(), "");
    }

    #[test]
    fn test_mapped_lookup_separates_absent_from_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structure.rkyv");
        sample().save(&path).unwrap();
        let mapped = MappedSnapshot::open(&path).unwrap();

        assert!(matches!(mapped.load("com.example.Nope"), Ok(None)));
        assert!(mapped.introspect("com.example.Nope").is_none());
        let zeta = mapped.introspect("com.example.Zeta").unwrap();
        assert_eq!(zeta.into_owned(), sample().get("com.example.Zeta").unwrap().clone());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.rkyv");
        std::fs::write(&path, b"definitely not an archive").unwrap();
        assert!(MappedSnapshot::open(&path).is_err());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StructureSnapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.type_names().is_empty());
    }
}
