//! AST node-kind classifier.
//!
//! Answers "does this source contain a loop / a ternary / a local record?"
//! purely from the syntax tree. Each [`NodeKindCategory`] maps to a set of
//! [`NodeShape`]s (a grammar node kind plus a structural position) in a
//! [`CategoryRegistry`]; a [`NodeClassifier`] runs one cursor traversal over
//! the requested [`Scope`] and reports per-category presence.
//!
//! Two distinctions are structural rather than by kind alone:
//! - tree-sitter-java parses both switch forms as `switch_expression`, so a
//!   switch is a *statement* when its parent is a statement container and an
//!   *expression* otherwise;
//! - a class or record is *local* when a block or constructor body is met
//!   before any type body on the way to the root.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;
use tree_sitter::Node;

use crate::introspect::declaration_kind;
use crate::path_util::java_sources;
use crate::{AnatomistError, ParserHost, SourceTree};

/// Errors raised while configuring or running a classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Unknown node-kind category: {0:?}")]
    UnknownCategory(String),

    #[error("Category {0} has no node shapes in this registry")]
    UnmappedCategory(NodeKindCategory),

    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    #[error(transparent)]
    Anatomist(#[from] AnatomistError),
}

/// A syntactic construct whose presence can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKindCategory {
    LocalClass,
    LocalRecord,
    AnyLocalType,
    IfStatement,
    ConditionalExpression,
    SwitchStatement,
    SwitchExpression,
    AnyConditional,
    ForLoop,
    ForEachLoop,
    WhileLoop,
    DoWhileLoop,
    AnyLoop,
    Assert,
    Throw,
    Catch,
    AnyExceptionHandling,
}

impl NodeKindCategory {
    pub const ALL: [NodeKindCategory; 17] = [
        NodeKindCategory::LocalClass,
        NodeKindCategory::LocalRecord,
        NodeKindCategory::AnyLocalType,
        NodeKindCategory::IfStatement,
        NodeKindCategory::ConditionalExpression,
        NodeKindCategory::SwitchStatement,
        NodeKindCategory::SwitchExpression,
        NodeKindCategory::AnyConditional,
        NodeKindCategory::ForLoop,
        NodeKindCategory::ForEachLoop,
        NodeKindCategory::WhileLoop,
        NodeKindCategory::DoWhileLoop,
        NodeKindCategory::AnyLoop,
        NodeKindCategory::Assert,
        NodeKindCategory::Throw,
        NodeKindCategory::Catch,
        NodeKindCategory::AnyExceptionHandling,
    ];

    /// Canonical kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            NodeKindCategory::LocalClass => "local-class",
            NodeKindCategory::LocalRecord => "local-record",
            NodeKindCategory::AnyLocalType => "any-local-type",
            NodeKindCategory::IfStatement => "if-statement",
            NodeKindCategory::ConditionalExpression => "conditional-expression",
            NodeKindCategory::SwitchStatement => "switch-statement",
            NodeKindCategory::SwitchExpression => "switch-expression",
            NodeKindCategory::AnyConditional => "any-conditional",
            NodeKindCategory::ForLoop => "for-loop",
            NodeKindCategory::ForEachLoop => "for-each-loop",
            NodeKindCategory::WhileLoop => "while-loop",
            NodeKindCategory::DoWhileLoop => "do-while-loop",
            NodeKindCategory::AnyLoop => "any-loop",
            NodeKindCategory::Assert => "assert",
            NodeKindCategory::Throw => "throw",
            NodeKindCategory::Catch => "catch",
            NodeKindCategory::AnyExceptionHandling => "any-exception-handling",
        }
    }

    /// Leaf categories a composite stands for; a leaf stands for itself.
    pub fn members(self) -> Vec<NodeKindCategory> {
        use NodeKindCategory::*;
        match self {
            AnyLocalType => vec![LocalClass, LocalRecord],
            AnyConditional => vec![
                IfStatement,
                ConditionalExpression,
                SwitchStatement,
                SwitchExpression,
            ],
            AnyLoop => vec![ForLoop, ForEachLoop, WhileLoop, DoWhileLoop],
            AnyExceptionHandling => vec![Assert, Throw, Catch],
            leaf => vec![leaf],
        }
    }
}

impl fmt::Display for NodeKindCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for NodeKindCategory {
    type Err = ClassifierError;

    /// Case-insensitive; `_` and spaces are accepted in place of `-`, and
    /// the usual short forms (`"loop"`, `"if"`, `"ternary"`, ...) are aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let category = match key.as_str() {
            "local-class" | "class" => NodeKindCategory::LocalClass,
            "local-record" | "record" => NodeKindCategory::LocalRecord,
            "any-local-type" | "local-type" | "class-type" => NodeKindCategory::AnyLocalType,
            "if-statement" | "if" => NodeKindCategory::IfStatement,
            "conditional-expression" | "ternary" | "if-expression" => {
                NodeKindCategory::ConditionalExpression
            }
            "switch-statement" | "switch" => NodeKindCategory::SwitchStatement,
            "switch-expression" => NodeKindCategory::SwitchExpression,
            "any-conditional" | "conditional" | "conditionals" => NodeKindCategory::AnyConditional,
            "for-loop" | "for" => NodeKindCategory::ForLoop,
            "for-each-loop" | "for-each" | "foreach" => NodeKindCategory::ForEachLoop,
            "while-loop" | "while" => NodeKindCategory::WhileLoop,
            "do-while-loop" | "do-while" => NodeKindCategory::DoWhileLoop,
            "any-loop" | "loop" | "loops" => NodeKindCategory::AnyLoop,
            "assert" | "assert-statement" => NodeKindCategory::Assert,
            "throw" | "throw-statement" => NodeKindCategory::Throw,
            "catch" | "catch-clause" => NodeKindCategory::Catch,
            "any-exception-handling" | "exception-handling" => {
                NodeKindCategory::AnyExceptionHandling
            }
            _ => return Err(ClassifierError::UnknownCategory(s.to_string())),
        };
        Ok(category)
    }
}

/// Where a node must sit for a shape to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Anywhere,
    /// Direct child of a statement container (block, loop body, ...).
    StatementPosition,
    /// Anywhere a statement container is not the direct parent.
    ExpressionPosition,
    /// Inside a method/constructor/initializer body rather than a type body.
    LocalDeclaration,
}

/// A grammar node kind at a structural position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeShape {
    pub kind: &'static str,
    pub position: Position,
}

const STATEMENT_CONTAINERS: &[&str] = &[
    "block",
    "constructor_body",
    "switch_block_statement_group",
    "labeled_statement",
    "if_statement",
    "while_statement",
    "for_statement",
    "enhanced_for_statement",
    "do_statement",
    "program",
];

const LOCAL_SCOPES: &[&str] = &["block", "constructor_body", "switch_block_statement_group"];

const TYPE_BODIES: &[&str] = &[
    "class_body",
    "interface_body",
    "enum_body",
    "enum_body_declarations",
    "annotation_type_body",
    "program",
];

impl NodeShape {
    pub const fn new(kind: &'static str, position: Position) -> Self {
        Self { kind, position }
    }

    pub const fn anywhere(kind: &'static str) -> Self {
        Self::new(kind, Position::Anywhere)
    }

    pub fn matches(&self, node: Node<'_>) -> bool {
        node.kind() == self.kind
            && match self.position {
                Position::Anywhere => true,
                Position::StatementPosition => in_statement_position(node),
                Position::ExpressionPosition => !in_statement_position(node),
                Position::LocalDeclaration => is_local(node),
            }
    }
}

fn in_statement_position(node: Node<'_>) -> bool {
    node.parent()
        .map(|p| STATEMENT_CONTAINERS.contains(&p.kind()))
        .unwrap_or(true)
}

fn is_local(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        let kind = ancestor.kind();
        if LOCAL_SCOPES.contains(&kind) {
            return true;
        }
        if TYPE_BODIES.contains(&kind) {
            return false;
        }
        current = ancestor.parent();
    }
    false
}

/// Category → node shapes.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    shapes: BTreeMap<NodeKindCategory, Vec<NodeShape>>,
}

static JAVA_REGISTRY: OnceLock<CategoryRegistry> = OnceLock::new();

impl CategoryRegistry {
    /// The built-in registry for tree-sitter-java, built once.
    pub fn java() -> &'static CategoryRegistry {
        JAVA_REGISTRY.get_or_init(build_java_registry)
    }

    /// A registry with no categories mapped.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds shapes to `category`, keeping existing ones.
    pub fn register<I>(&mut self, category: NodeKindCategory, shapes: I)
    where
        I: IntoIterator<Item = NodeShape>,
    {
        let entry = self.shapes.entry(category).or_default();
        for shape in shapes {
            if !entry.contains(&shape) {
                entry.push(shape);
            }
        }
    }

    /// Shapes of `category`.
    ///
    /// # Errors
    /// `ClassifierError::UnmappedCategory` if nothing was registered for it.
    pub fn shapes(&self, category: NodeKindCategory) -> Result<&[NodeShape], ClassifierError> {
        self.shapes
            .get(&category)
            .filter(|s| !s.is_empty())
            .map(Vec::as_slice)
            .ok_or(ClassifierError::UnmappedCategory(category))
    }

    pub fn categories(&self) -> impl Iterator<Item = NodeKindCategory> + '_ {
        self.shapes.keys().copied()
    }
}

fn build_java_registry() -> CategoryRegistry {
    use NodeKindCategory::*;
    use Position::*;

    let mut registry = CategoryRegistry::empty();
    registry.register(LocalClass, [NodeShape::new("class_declaration", LocalDeclaration)]);
    registry.register(LocalRecord, [NodeShape::new("record_declaration", LocalDeclaration)]);
    registry.register(IfStatement, [NodeShape::anywhere("if_statement")]);
    registry.register(ConditionalExpression, [NodeShape::anywhere("ternary_expression")]);
    registry.register(
        SwitchStatement,
        [
            NodeShape::new("switch_expression", StatementPosition),
            // older grammar releases
            NodeShape::anywhere("switch_statement"),
        ],
    );
    registry.register(SwitchExpression, [NodeShape::new("switch_expression", ExpressionPosition)]);
    registry.register(ForLoop, [NodeShape::anywhere("for_statement")]);
    registry.register(ForEachLoop, [NodeShape::anywhere("enhanced_for_statement")]);
    registry.register(WhileLoop, [NodeShape::anywhere("while_statement")]);
    registry.register(DoWhileLoop, [NodeShape::anywhere("do_statement")]);
    registry.register(Assert, [NodeShape::anywhere("assert_statement")]);
    registry.register(Throw, [NodeShape::anywhere("throw_statement")]);
    registry.register(Catch, [NodeShape::anywhere("catch_clause")]);

    for composite in [AnyLocalType, AnyConditional, AnyLoop, AnyExceptionHandling] {
        let union: Vec<NodeShape> = composite
            .members()
            .into_iter()
            .filter_map(|leaf| registry.shapes.get(&leaf).cloned())
            .flatten()
            .collect();
        registry.register(composite, union);
    }
    registry
}

/// Whether to stop at the first hit or count everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Stop as soon as every requested category has one occurrence.
    #[default]
    FirstHit,
    Exhaustive,
}

/// The region of a compilation unit to search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    WholeFile,
    /// Bodies of every method (or constructor) called `name`, optionally
    /// only inside the type whose simple name is `class`.
    Method { class: Option<String>, name: String },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::WholeFile => f.write_str("whole file"),
            Scope::Method { class: Some(class), name } => write!(f, "{class}#{name}"),
            Scope::Method { class: None, name } => write!(f, "#{name}"),
        }
    }
}

/// One matching node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub path: String,
    /// 1-based.
    pub start_line: usize,
    pub end_line: usize,
    pub node_kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPresence {
    pub category: NodeKindCategory,
    pub present: bool,
    pub count: usize,
    pub occurrences: Vec<Occurrence>,
}

impl CategoryPresence {
    fn absent(category: NodeKindCategory) -> Self {
        Self {
            category,
            present: false,
            count: 0,
            occurrences: Vec::new(),
        }
    }
}

/// Per-category result of a presence query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceReport {
    pub categories: BTreeMap<NodeKindCategory, CategoryPresence>,
}

impl PresenceReport {
    fn absent<I: IntoIterator<Item = NodeKindCategory>>(categories: I) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c, CategoryPresence::absent(c)))
                .collect(),
        }
    }

    pub fn is_present(&self, category: NodeKindCategory) -> bool {
        self.categories
            .get(&category)
            .map(|p| p.present)
            .unwrap_or(false)
    }

    pub fn count(&self, category: NodeKindCategory) -> usize {
        self.categories.get(&category).map(|p| p.count).unwrap_or(0)
    }

    pub fn get(&self, category: NodeKindCategory) -> Option<&CategoryPresence> {
        self.categories.get(&category)
    }

    /// `true` when every queried category was found.
    pub fn all_present(&self) -> bool {
        self.categories.values().all(|p| p.present)
    }

    /// Folds another report (e.g. from another file) into this one.
    pub fn merge(&mut self, other: PresenceReport) {
        for (category, presence) in other.categories {
            let entry = self
                .categories
                .entry(category)
                .or_insert_with(|| CategoryPresence::absent(category));
            entry.present |= presence.present;
            entry.count += presence.count;
            entry.occurrences.extend(presence.occurrences);
        }
    }
}

/// Pre-order walk of the subtree under `root`; `visit` returns `false` to stop.
///
/// Depth is tracked so the cursor never moves past `root`'s siblings.
fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if !visit(cursor.node()) {
            return;
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if depth == 0 {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// Simple name of the declared type owning `node`; `None` inside an
/// anonymous class body.
fn enclosing_type_name<'a>(tree: &'a SourceTree, node: Node<'_>) -> Option<&'a str> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.kind() == "object_creation_expression" {
            return None;
        }
        if declaration_kind(ancestor.kind()).is_some() {
            return ancestor.child_by_field_name("name").map(|n| tree.text(n));
        }
        current = ancestor.parent();
    }
    None
}

fn scope_roots<'t>(tree: &'t SourceTree, scope: &Scope) -> Result<Vec<Node<'t>>, ClassifierError> {
    let (class, name) = match scope {
        Scope::WholeFile => return Ok(vec![tree.root()]),
        Scope::Method { class, name } => (class.as_deref(), name.as_str()),
    };
    let class = class.map(|c| c.rsplit('.').next().unwrap_or(c));

    let mut roots = Vec::new();
    walk(tree.root(), |node| {
        if matches!(node.kind(), "method_declaration" | "constructor_declaration")
            && node.child_by_field_name("name").map(|n| tree.text(n)) == Some(name)
            && class.map_or(true, |c| enclosing_type_name(tree, node) == Some(c))
        {
            // a same-named method nested in an earlier body is already covered
            let covered = roots.iter().any(|r: &Node<'t>| {
                r.start_byte() <= node.start_byte() && node.end_byte() <= r.end_byte()
            });
            if !covered {
                roots.push(node.child_by_field_name("body").unwrap_or(node));
            }
        }
        true
    });
    if roots.is_empty() {
        return Err(ClassifierError::ScopeNotFound(scope.to_string()));
    }
    Ok(roots)
}

/// Runs presence queries against a [`CategoryRegistry`].
///
/// # Example
/// ```
/// use anatomist::{NodeClassifier, NodeKindCategory, ParserHost, ScanMode, Scope};
///
/// let mut host = ParserHost::new().unwrap();
/// let tree = host
///     .parse(b"class A { void f() { for (;;) {} } }", "A.java")
///     .unwrap();
/// let report = NodeClassifier::java()
///     .presence(&tree, &[NodeKindCategory::AnyLoop], &Scope::WholeFile, ScanMode::FirstHit)
///     .unwrap();
/// assert!(report.is_present(NodeKindCategory::AnyLoop));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NodeClassifier<'r> {
    registry: &'r CategoryRegistry,
}

impl NodeClassifier<'static> {
    pub fn java() -> Self {
        Self::new(CategoryRegistry::java())
    }
}

impl<'r> NodeClassifier<'r> {
    pub fn new(registry: &'r CategoryRegistry) -> Self {
        Self { registry }
    }

    fn resolve(
        &self,
        categories: &[NodeKindCategory],
    ) -> Result<Vec<(NodeKindCategory, &'r [NodeShape])>, ClassifierError> {
        let mut wanted: Vec<(NodeKindCategory, &'r [NodeShape])> = Vec::new();
        for &category in categories {
            if wanted.iter().any(|(c, _)| *c == category) {
                continue;
            }
            wanted.push((category, self.registry.shapes(category)?));
        }
        Ok(wanted)
    }

    /// Reports which of `categories` occur inside `scope` of `tree`.
    ///
    /// # Errors
    /// - `UnmappedCategory` if the registry has no shapes for a category
    /// - `ScopeNotFound` if a method scope matches no declaration
    pub fn presence(
        &self,
        tree: &SourceTree,
        categories: &[NodeKindCategory],
        scope: &Scope,
        mode: ScanMode,
    ) -> Result<PresenceReport, ClassifierError> {
        let wanted = self.resolve(categories)?;
        let roots = scope_roots(tree, scope)?;
        let mut report = PresenceReport::absent(wanted.iter().map(|(c, _)| *c));
        let mut remaining = wanted.len();

        for root in roots {
            let mut stopped = false;
            walk(root, |node| {
                for (category, shapes) in &wanted {
                    if !shapes.iter().any(|s| s.matches(node)) {
                        continue;
                    }
                    let Some(entry) = report.categories.get_mut(category) else {
                        continue;
                    };
                    if mode == ScanMode::FirstHit && entry.present {
                        continue;
                    }
                    if !entry.present {
                        entry.present = true;
                        remaining -= 1;
                    }
                    entry.count += 1;
                    entry.occurrences.push(Occurrence {
                        path: tree.path().to_string(),
                        start_line: node.start_position().row + 1,
                        end_line: node.end_position().row + 1,
                        node_kind: node.kind().to_string(),
                    });
                }
                stopped = mode == ScanMode::FirstHit && remaining == 0;
                !stopped
            });
            if stopped {
                break;
            }
        }

        tracing::debug!(
            path = tree.path(),
            %scope,
            found = report.categories.values().filter(|p| p.present).count(),
            requested = report.categories.len(),
            "presence query"
        );
        Ok(report)
    }

    /// Runs [`presence`](Self::presence) over every `.java` file under
    /// `root` and merges the per-file results.
    pub fn scan_directory(
        &self,
        root: &Path,
        categories: &[NodeKindCategory],
        mode: ScanMode,
    ) -> Result<PresenceReport, ClassifierError> {
        let wanted = self.resolve(categories)?;
        let mut merged = PresenceReport::absent(wanted.iter().map(|(c, _)| *c));
        let mut host = ParserHost::new()?;
        for file in java_sources(root)? {
            let tree = host.parse_file(&file)?;
            merged.merge(self.presence(&tree, categories, &Scope::WholeFile, mode)?);
            if mode == ScanMode::FirstHit && merged.all_present() {
                break;
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeKindCategory::*;

    const WITH_CONDITIONALS: &str = r#"
package grading.yes;

import java.util.Random;

public class ClassWithAnyKindsOfConditionals {

    public void ifStatement() {
        int x = new Random().nextInt(3);
        if (x == 1) {
            System.out.println("Hello");
        } else if (x == 0) {
            System.out.println("World");
        } else {
            System.out.println("!");
        }
    }

    public void ifExpression() {
        int x = new Random().nextInt(3);
        System.out.println(x == 1 ? "Hello" : (x == 0 ? "World" : "!"));
    }

    public void switchStatement() {
        String output;
        switch (new Random().nextInt(3)) {
        case 1:
            output = "Hello";
            break;
        default:
            output = "!";
            break;
        }
        System.out.println(output);
    }
}
"#;

    const WITHOUT_CONDITIONALS: &str = r#"
package grading.no;

import java.util.Random;
import java.util.stream.IntStream;

public class ClassWithNoKindsOfConditionals {

    public void forLoop() {
        for (int i = 0; i < (new Random().nextInt(3)); i++) {
            System.out.println("Hello World");
        }
    }

    public void forEachLoop() {
        for (int integer : new int[] { 1, 2, 3 }) {
            System.out.println("Hello World");
        }
    }

    public void whileLoop() {
        int i = 0;
        while (i < 3) {
            i++;
        }
    }

    public void doWhileLoop() {
        int i = 0;
        do {
            i++;
        } while (i < 3);
    }

    public void forEachStream() {
        IntStream.range(0, 3).mapToObj((int i) -> "Hello World").forEach(System.out::println);
    }

    public void assertStatement() {
        assert (new Random().nextInt(3)) == 0;
    }

    public void throwStatement() throws Exception {
        throw new Exception("This is a checked exception.");
    }

    public void catchStatement() {
        try {
            throwStatement();
        } catch (Exception e) {
        }
    }

    void localClassContainingFunction() {
        class localClass {
        }
    }
}
"#;

    fn parse(source: &str) -> SourceTree {
        let mut host = ParserHost::new().unwrap();
        host.parse(source.as_bytes(), "Test.java").unwrap()
    }

    fn exhaustive(source: &str, categories: &[NodeKindCategory]) -> PresenceReport {
        NodeClassifier::java()
            .presence(&parse(source), categories, &Scope::WholeFile, ScanMode::Exhaustive)
            .unwrap()
    }

    #[test]
    fn test_for_loop_without_if() {
        let source = "class A { void m() { \
                      for (int i = 0; i < 3; i++) { System.out.println(i); } } }";
        let report = exhaustive(source, &[AnyLoop, IfStatement]);
        assert!(report.is_present(AnyLoop));
        assert!(!report.is_present(IfStatement));
        assert_eq!(report.count(AnyLoop), 1);
        assert_eq!(report.get(AnyLoop).unwrap().occurrences[0].node_kind, "for_statement");
    }

    #[test]
    fn test_method_with_for_loop_and_if() {
        let tree = parse(
            r#"
class Grader {
    int countEven(int[] xs) {
        int n = 0;
        for (int i = 0; i < xs.length; i++) {
            if (xs[i] % 2 == 0) {
                n++;
            }
        }
        return n;
    }
}
"#,
        );
        let scope = Scope::Method {
            class: Some("Grader".into()),
            name: "countEven".into(),
        };
        let report = NodeClassifier::java()
            .presence(&tree, &[AnyLoop, SwitchStatement, IfStatement], &scope, ScanMode::FirstHit)
            .unwrap();
        assert!(report.is_present(AnyLoop));
        assert!(!report.is_present(SwitchStatement));
        assert!(report.is_present(IfStatement));
    }

    #[test]
    fn test_method_scope_ignores_anonymous_class_members() {
        let tree = parse(
            r#"
class Outer {
    Runnable task = new Runnable() {
        public void run() {
            for (int i = 0; i < 3; i++) {}
        }
    };
    void idle() {}
}
"#,
        );
        let scope = Scope::Method {
            class: Some("Outer".into()),
            name: "run".into(),
        };
        assert!(matches!(
            NodeClassifier::java().presence(&tree, &[AnyLoop], &scope, ScanMode::FirstHit),
            Err(ClassifierError::ScopeNotFound(_))
        ));
    }

    #[test]
    fn test_nested_same_named_method_counted_once() {
        let tree = parse(
            r#"
class A {
    void go() {
        Object o = new Object() {
            void go() {
                if (true) {}
            }
        };
    }
}
"#,
        );
        let scope = Scope::Method {
            class: None,
            name: "go".into(),
        };
        let report = NodeClassifier::java()
            .presence(&tree, &[IfStatement], &scope, ScanMode::Exhaustive)
            .unwrap();
        assert_eq!(report.count(IfStatement), 1);
    }

    #[test]
    fn test_conditionals_present() {
        let report = exhaustive(
            WITH_CONDITIONALS,
            &[
                AnyConditional,
                IfStatement,
                ConditionalExpression,
                SwitchStatement,
                SwitchExpression,
            ],
        );
        assert!(report.is_present(AnyConditional));
        assert_eq!(report.count(IfStatement), 2, "else-if is a nested if statement");
        assert_eq!(report.count(ConditionalExpression), 2);
        assert_eq!(report.count(SwitchStatement), 1);
        assert!(!report.is_present(SwitchExpression));
        assert_eq!(report.count(AnyConditional), 5);
    }

    #[test]
    fn test_no_conditionals_but_everything_else() {
        let report = exhaustive(
            WITHOUT_CONDITIONALS,
            &[
                AnyConditional,
                AnyLoop,
                ForLoop,
                ForEachLoop,
                WhileLoop,
                DoWhileLoop,
                Assert,
                Throw,
                Catch,
                AnyExceptionHandling,
                LocalClass,
                LocalRecord,
                AnyLocalType,
            ],
        );
        assert!(!report.is_present(AnyConditional));
        assert_eq!(report.count(AnyLoop), 4);
        for leaf in [ForLoop, ForEachLoop, WhileLoop, DoWhileLoop, Assert, Throw, Catch] {
            assert_eq!(report.count(leaf), 1, "{leaf}");
        }
        assert_eq!(report.count(AnyExceptionHandling), 3);
        assert!(report.is_present(LocalClass));
        assert!(!report.is_present(LocalRecord));
        assert!(report.is_present(AnyLocalType));
    }

    #[test]
    fn test_switch_statement_vs_expression() {
        let source = r#"
class S {
    int pick(int x) {
        int y = switch (x) { case 1 -> 10; default -> 20; };
        return y;
    }
    void run(int x) {
        switch (x) {
            case 1 -> System.out.println("one");
            default -> {}
        }
    }
}
"#;
        let report = exhaustive(source, &[SwitchStatement, SwitchExpression]);
        assert_eq!(report.count(SwitchExpression), 1);
        assert_eq!(report.count(SwitchStatement), 1);
        assert_eq!(report.get(SwitchExpression).unwrap().occurrences[0].start_line, 4);
        assert_eq!(report.get(SwitchStatement).unwrap().occurrences[0].start_line, 8);
    }

    #[test]
    fn test_member_types_are_not_local() {
        let source = r#"
class Outer {
    class Inner {}
    record Member(int a) {}
    Outer() { record InCtor(int b) {} }
    void m() { Runnable r = new Runnable() { public void run() {} }; }
}
"#;
        let report = exhaustive(source, &[LocalClass, LocalRecord]);
        assert!(!report.is_present(LocalClass));
        assert_eq!(report.count(LocalRecord), 1);
    }

    #[test]
    fn test_first_hit_stops_at_one() {
        let report = NodeClassifier::java()
            .presence(
                &parse(WITHOUT_CONDITIONALS),
                &[AnyLoop, AnyLoop],
                &Scope::WholeFile,
                ScanMode::FirstHit,
            )
            .unwrap();
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.count(AnyLoop), 1);
    }

    #[test]
    fn test_method_scope() {
        let tree = parse(WITHOUT_CONDITIONALS);
        let classifier = NodeClassifier::java();
        let scope = Scope::Method {
            class: Some("ClassWithNoKindsOfConditionals".into()),
            name: "whileLoop".into(),
        };
        let report = classifier
            .presence(&tree, &[WhileLoop, ForLoop, Throw], &scope, ScanMode::Exhaustive)
            .unwrap();
        assert!(report.is_present(WhileLoop));
        assert!(!report.is_present(ForLoop));
        assert!(!report.is_present(Throw));

        let missing = Scope::Method {
            class: None,
            name: "noSuchMethod".into(),
        };
        assert!(matches!(
            classifier.presence(&tree, &[AnyLoop], &missing, ScanMode::FirstHit),
            Err(ClassifierError::ScopeNotFound(_))
        ));

        let wrong_class = Scope::Method {
            class: Some("Elsewhere".into()),
            name: "whileLoop".into(),
        };
        assert!(classifier
            .presence(&tree, &[AnyLoop], &wrong_class, ScanMode::FirstHit)
            .is_err());
    }

    #[test]
    fn test_category_names_and_aliases() {
        assert_eq!("loop".parse::<NodeKindCategory>().unwrap(), AnyLoop);
        assert_eq!("If".parse::<NodeKindCategory>().unwrap(), IfStatement);
        assert_eq!("switch_expression".parse::<NodeKindCategory>().unwrap(), SwitchExpression);
        assert_eq!("do while".parse::<NodeKindCategory>().unwrap(), DoWhileLoop);
        for category in NodeKindCategory::ALL {
            assert_eq!(category.name().parse::<NodeKindCategory>().unwrap(), category);
        }
        assert!(matches!(
            "goto".parse::<NodeKindCategory>(),
            Err(ClassifierError::UnknownCategory(name)) if name == "goto"
        ));
    }

    #[test]
    fn test_every_category_mapped_in_java_registry() {
        let registry = CategoryRegistry::java();
        for category in NodeKindCategory::ALL {
            assert!(registry.shapes(category).is_ok(), "{category}");
        }
        assert_eq!(registry.shapes(AnyLoop).unwrap().len(), 4);
    }

    #[test]
    fn test_unmapped_category_in_custom_registry() {
        let mut registry = CategoryRegistry::empty();
        registry.register(Throw, [NodeShape::anywhere("throw_statement")]);
        let classifier = NodeClassifier::new(&registry);
        let tree = parse(WITHOUT_CONDITIONALS);

        let report = classifier
            .presence(&tree, &[Throw], &Scope::WholeFile, ScanMode::FirstHit)
            .unwrap();
        assert!(report.is_present(Throw));
        assert!(matches!(
            classifier.presence(&tree, &[Catch], &Scope::WholeFile, ScanMode::FirstHit),
            Err(ClassifierError::UnmappedCategory(Catch))
        ));
    }

    #[test]
    fn test_scan_directory_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Yes.java"), WITH_CONDITIONALS).unwrap();
        std::fs::write(dir.path().join("No.java"), WITHOUT_CONDITIONALS).unwrap();

        let report = NodeClassifier::java()
            .scan_directory(
                dir.path(),
                &[IfStatement, AnyLoop, SwitchExpression],
                ScanMode::Exhaustive,
            )
            .unwrap();
        assert_eq!(report.count(IfStatement), 2);
        assert_eq!(report.count(AnyLoop), 4);
        assert!(!report.is_present(SwitchExpression));
        let if_paths: Vec<_> = report
            .get(IfStatement)
            .unwrap()
            .occurrences
            .iter()
            .map(|o| o.path.as_str())
            .collect();
        assert!(if_paths.iter().all(|p| p.ends_with("Yes.java")));
    }

    #[test]
    fn test_empty_directory_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let report = NodeClassifier::java()
            .scan_directory(dir.path(), &[Catch], ScanMode::FirstHit)
            .unwrap();
        assert!(!report.is_present(Catch));
        assert_eq!(report.categories.len(), 1);
    }
}
