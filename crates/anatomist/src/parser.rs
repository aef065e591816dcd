//! Tree-sitter Java parser host.
//!
//! A [`ParserHost`] owns one configured `tree_sitter::Parser` and produces
//! [`SourceTree`]s, which keep the parsed tree together with the bytes it was
//! parsed from so node text can always be recovered.

use std::fs::File;
use std::path::Path;

use memmap2::MmapOptions;
use tree_sitter::{Node, Parser, Tree};

use crate::path_util::normalize_path;
use crate::AnatomistError;

/// A parsed Java compilation unit plus its source bytes.
pub struct SourceTree {
    tree: Tree,
    source: Vec<u8>,
    path: String,
}

impl SourceTree {
    /// Root `program` node.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Normalized path (or caller supplied label) of the compilation unit.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `true` if tree-sitter had to recover from at least one syntax error.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// UTF-8 text of `node`, or an empty string for non-UTF-8 bytes.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// The parser host for Java sources.
///
/// # Example
/// ```no_run
/// use anatomist::ParserHost;
/// use std::path::Path;
///
/// let mut host = ParserHost::new().unwrap();
/// let tree = host.parse_file(Path::new("src/com/example/Foo.java")).unwrap();
/// assert!(!tree.has_errors());
/// ```
pub struct ParserHost {
    parser: Parser,
}

impl ParserHost {
    /// Creates a new parser host with the Java grammar loaded.
    ///
    /// # Errors
    /// Returns `AnatomistError::ParseFailure` if the grammar cannot be loaded
    /// (ABI mismatch between `tree-sitter` and `tree-sitter-java`).
    pub fn new() -> Result<Self, AnatomistError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| {
                AnatomistError::ParseFailure(format!("Failed to load Java grammar: {}", e))
            })?;
        Ok(Self { parser })
    }

    /// Parses an in-memory buffer; `label` is recorded as the tree's path.
    pub fn parse(&mut self, source: &[u8], label: &str) -> Result<SourceTree, AnatomistError> {
        if source.len() > u32::MAX as usize {
            return Err(AnatomistError::ByteRangeOverflow);
        }
        let tree = self.parser.parse(source, None).ok_or_else(|| {
            AnatomistError::ParseFailure("Tree-sitter parse returned None".to_string())
        })?;
        let parsed = SourceTree {
            tree,
            source: source.to_vec(),
            path: label.to_string(),
        };
        if parsed.has_errors() {
            tracing::warn!(path = label, "syntax errors recovered while parsing");
        }
        Ok(parsed)
    }

    /// Parses a file using memory-mapped I/O.
    ///
    /// # Errors
    /// - `IoError`: file not found, permission denied, mmap failure
    /// - `ByteRangeOverflow`: file larger than 4GB (tree-sitter u32 limit)
    /// - `ParseFailure`: tree-sitter returned no tree
    pub fn parse_file(&mut self, path: &Path) -> Result<SourceTree, AnatomistError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len > u32::MAX as u64 {
            return Err(AnatomistError::ByteRangeOverflow);
        }
        let label = normalize_path(path)?;
        if file_len == 0 {
            return self.parse(b"", &label);
        }

        // SAFETY: The file handle is held for the duration of the mmap lifetime.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        self.parse(&mmap[..], &label)
    }
}
