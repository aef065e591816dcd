//! Declared-structure extraction from Java syntax trees.
//!
//! Produces [`ClassDescriptor`]s that read like what runtime reflection
//! reports for the compiled class, so an oracle written against reflection
//! output can be checked against source alone:
//!
//! - Types are erased simple names (`List<String>` is `List`, `T` is its
//!   first bound or `Object`, varargs are arrays).
//! - Implicit members are materialized: default constructors, record
//!   accessors/fields/canonical constructors, enum `values()`/`valueOf`
//!   and constant fields.
//! - Implicit modifiers are added (interface members, nested enums/records,
//!   `final` on records and body-less enums).
//! - Source-retention annotations (`@Override`, `@SuppressWarnings`) are
//!   dropped since reflection never sees them.
//!
//! Local and anonymous classes are not part of the declared model.

use common::descriptor::{parameters_match, simple_type_name};
use common::{
    AnnotationDescriptor, AttributeDescriptor, ClassDescriptor, ClassKind, ConstructorDescriptor,
    MethodDescriptor, ModifierSet,
};
use tree_sitter::Node;

use crate::SourceTree;

const SOURCE_RETENTION: &[&str] = &["Override", "SuppressWarnings", "SafeVarargs"];

const VISIBILITY: &[&str] = &["public", "protected", "private"];

/// Maps a declaration node kind to the type kind it declares.
pub fn declaration_kind(kind: &str) -> Option<ClassKind> {
    match kind {
        "class_declaration" => Some(ClassKind::Class),
        "interface_declaration" | "annotation_type_declaration" => Some(ClassKind::Interface),
        "enum_declaration" => Some(ClassKind::Enum),
        "record_declaration" => Some(ClassKind::Record),
        _ => None,
    }
}

/// Lexical context while descending into nested declarations.
struct Frame {
    package: String,
    /// Enclosing types, outermost first.
    outer: Vec<(String, ClassKind)>,
    /// Type variables in scope mapped to their erasure.
    type_vars: Vec<(String, String)>,
}

impl Frame {
    fn erase(&self, simple: &str) -> String {
        let base = simple.trim_end_matches("[]");
        let dims = (simple.len() - base.len()) / 2;
        match self.type_vars.iter().rev().find(|(name, _)| name == base) {
            Some((_, erasure)) => format!("{erasure}{}", "[]".repeat(dims)),
            None => simple.to_string(),
        }
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let nodes: Vec<_> = node.named_children(&mut cursor).collect();
    nodes
}

fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|n| kinds.contains(&n.kind()))
}

/// Extracts every (non-local) type declared in `tree`, outer types before
/// the types nested in them.
///
/// # Example
/// ```
/// use anatomist::{introspect::extract_types, ParserHost};
///
/// let mut host = ParserHost::new().unwrap();
/// let tree = host.parse(b"package a; public class Foo { int x; }", "Foo.java").unwrap();
/// let types = extract_types(&tree);
/// assert_eq!(types[0].qualified_name, "a.Foo");
/// assert_eq!(types[0].attributes[0].type_name, "int");
/// ```
pub fn extract_types(tree: &SourceTree) -> Vec<ClassDescriptor> {
    let root = tree.root();
    let mut frame = Frame {
        package: package_name(tree),
        outer: Vec::new(),
        type_vars: Vec::new(),
    };
    let mut out = Vec::new();
    for child in named_children(root) {
        if declaration_kind(child.kind()).is_some() {
            collect_type(tree, child, &mut frame, &mut out);
        }
    }
    out
}

/// Declared package of the compilation unit, empty for the default package.
pub fn package_name(tree: &SourceTree) -> String {
    child_of_kind(tree.root(), &["package_declaration"])
        .and_then(|pkg| child_of_kind(pkg, &["scoped_identifier", "identifier"]))
        .map(|name| tree.text(name).split_whitespace().collect())
        .unwrap_or_default()
}

/// Simple name of the enclosing class whose instance an inner (non-static
/// member) class captures. Reflection lists it as the first constructor
/// parameter.
fn enclosing_instance(frame: &Frame, kind: ClassKind, modifiers: &ModifierSet) -> Option<String> {
    let (outer, outer_kind) = frame.outer.last()?;
    let inner = kind == ClassKind::Class
        && *outer_kind != ClassKind::Interface
        && !modifiers.contains("static");
    inner.then(|| outer.clone())
}

fn collect_type(
    tree: &SourceTree,
    node: Node<'_>,
    frame: &mut Frame,
    out: &mut Vec<ClassDescriptor>,
) {
    let Some(kind) = declaration_kind(node.kind()) else {
        return;
    };
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = tree.text(name_node).to_string();

    let mut nested_path: Vec<&str> = frame.outer.iter().map(|(n, _)| n.as_str()).collect();
    nested_path.push(&name);
    let mut class = ClassDescriptor::new(&frame.package, &nested_path.join("."), kind);
    class.simple_name = name.clone();
    class.source_path = tree.path().to_string();

    let (mut modifiers, annotations) = modifiers_of(tree, node);
    if let Some((_, outer_kind)) = frame.outer.last() {
        if *outer_kind == ClassKind::Interface {
            modifiers.insert("public");
            modifiers.insert("static");
        }
        if kind != ClassKind::Class {
            modifiers.insert("static");
        }
    }
    match kind {
        ClassKind::Enum if !has_constant_bodies(node) => modifiers.insert("final"),
        ClassKind::Record => modifiers.insert("final"),
        ClassKind::Interface => {
            modifiers.insert("abstract");
            modifiers.insert("interface");
        }
        _ => {}
    }
    class.modifiers = modifiers;
    class.annotations = annotations;

    let saved_vars = frame.type_vars.len();
    push_type_parameters(tree, node, frame);

    class.superclass = match kind {
        ClassKind::Enum => Some("Enum".to_string()),
        ClassKind::Record => Some("Record".to_string()),
        ClassKind::Class => child_of_kind(node, &["superclass"])
            .and_then(|s| named_children(s).into_iter().next())
            .map(|t| strip_type_arguments(tree.text(t))),
        ClassKind::Interface => None,
    };
    if let Some(list) = child_of_kind(node, &["super_interfaces", "extends_interfaces"])
        .and_then(|n| child_of_kind(n, &["type_list"]))
    {
        class.interfaces = named_children(list)
            .into_iter()
            .map(|t| strip_type_arguments(tree.text(t)))
            .collect();
    }

    let mut nested = Vec::new();
    let mut compact = None;
    if let Some(body) = node.child_by_field_name("body") {
        let mut members = Vec::new();
        for member in named_children(body) {
            if member.kind() == "enum_body_declarations" {
                members.extend(named_children(member));
            } else {
                members.push(member);
            }
        }
        for member in members {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    class.attributes.extend(attributes_of(tree, member, kind, frame))
                }
                "method_declaration" | "annotation_type_element_declaration" => {
                    if let Some(method) = method_of(tree, member, kind, frame) {
                        class.methods.push(method);
                    }
                }
                "constructor_declaration" => {
                    if let Some(ctor) = constructor_of(tree, member, &name, kind, frame) {
                        class.constructors.push(ctor);
                    }
                }
                "compact_constructor_declaration" => compact = Some(member),
                "enum_constant" => {
                    if let Some(constant) = member.child_by_field_name("name") {
                        class.enum_values.push(tree.text(constant).to_string());
                    }
                }
                other if declaration_kind(other).is_some() => nested.push(member),
                _ => {}
            }
        }
    }

    match kind {
        ClassKind::Record => add_record_members(tree, node, &mut class, compact, frame),
        ClassKind::Enum => add_enum_members(&mut class),
        ClassKind::Class if class.constructors.is_empty() => {
            let ctor = ConstructorDescriptor {
                class_name: name.clone(),
                parameters: Vec::new(),
                modifiers: visibility_of(&class.modifiers),
                annotations: Vec::new(),
            };
            class.constructors.push(ctor);
        }
        _ => {}
    }
    if let Some(outer) = enclosing_instance(frame, kind, &class.modifiers) {
        for ctor in &mut class.constructors {
            ctor.parameters.insert(0, outer.clone());
        }
    }

    tracing::trace!(
        class = %class.qualified_name,
        methods = class.methods.len(),
        attributes = class.attributes.len(),
        "extracted type"
    );
    out.push(class);

    frame.outer.push((name, kind));
    for member in nested {
        collect_type(tree, member, frame, out);
    }
    frame.outer.pop();
    frame.type_vars.truncate(saved_vars);
}

/// Modifier keywords and reflection-visible annotations of a declaration.
fn modifiers_of(tree: &SourceTree, decl: Node<'_>) -> (ModifierSet, Vec<AnnotationDescriptor>) {
    let mut modifiers = ModifierSet::new();
    let mut annotations = Vec::new();
    let Some(mods) = child_of_kind(decl, &["modifiers"]) else {
        return (modifiers, annotations);
    };
    let mut cursor = mods.walk();
    let tokens: Vec<_> = mods.children(&mut cursor).collect();
    for child in tokens {
        match child.kind() {
            "marker_annotation" | "annotation" => {
                if let Some(annotation) = annotation_of(tree, child) {
                    if !SOURCE_RETENTION.contains(&annotation.type_name.as_str()) {
                        annotations.push(annotation);
                    }
                }
            }
            "line_comment" | "block_comment" => {}
            _ => modifiers.insert(tree.text(child)),
        }
    }
    (modifiers, annotations)
}

fn annotation_of(tree: &SourceTree, node: Node<'_>) -> Option<AnnotationDescriptor> {
    let name = node.child_by_field_name("name")?;
    let mut annotation = AnnotationDescriptor::new(tree.text(name));
    if let Some(args) = node.child_by_field_name("arguments") {
        for arg in named_children(args) {
            match arg.kind() {
                "element_value_pair" => {
                    if let (Some(key), Some(value)) =
                        (arg.child_by_field_name("key"), arg.child_by_field_name("value"))
                    {
                        annotation = annotation.with_attribute(tree.text(key), tree.text(value));
                    }
                }
                "line_comment" | "block_comment" => {}
                _ => annotation = annotation.with_attribute("value", tree.text(arg)),
            }
        }
    }
    Some(annotation)
}

fn has_constant_bodies(enum_decl: Node<'_>) -> bool {
    enum_decl
        .child_by_field_name("body")
        .map(|body| {
            named_children(body)
                .into_iter()
                .filter(|n| n.kind() == "enum_constant")
                .any(|c| c.child_by_field_name("body").is_some())
        })
        .unwrap_or(false)
}

fn visibility_of(modifiers: &ModifierSet) -> ModifierSet {
    ModifierSet::from_tokens(VISIBILITY.iter().filter(|v| modifiers.contains(v)))
}

/// Drops generic arguments and whitespace but keeps any package qualifier.
fn strip_type_arguments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}

fn push_type_parameters(tree: &SourceTree, decl: Node<'_>, frame: &mut Frame) {
    let Some(params) = decl
        .child_by_field_name("type_parameters")
        .or_else(|| child_of_kind(decl, &["type_parameters"]))
    else {
        return;
    };
    for param in named_children(params) {
        if param.kind() != "type_parameter" {
            continue;
        }
        let kids = named_children(param);
        let Some(name) = kids
            .iter()
            .find(|n| matches!(n.kind(), "type_identifier" | "identifier"))
            .map(|n| tree.text(*n).to_string())
        else {
            continue;
        };
        let erasure = kids
            .iter()
            .find(|n| n.kind() == "type_bound")
            .and_then(|bound| named_children(*bound).into_iter().next())
            .map(|first| frame.erase(&simple_type_name(tree.text(first))))
            .unwrap_or_else(|| "Object".to_string());
        frame.type_vars.push((name, erasure));
    }
}

/// Erased simple name of a type node, with `extra_dims` array dimensions appended.
fn erased_type(tree: &SourceTree, type_node: Node<'_>, extra_dims: usize, frame: &Frame) -> String {
    let node = if type_node.kind() == "annotated_type" {
        named_children(type_node)
            .into_iter()
            .rev()
            .find(|n| !matches!(n.kind(), "marker_annotation" | "annotation"))
            .unwrap_or(type_node)
    } else {
        type_node
    };
    let erased = frame.erase(&simple_type_name(tree.text(node)));
    format!("{erased}{}", "[]".repeat(extra_dims))
}

fn dims_of(tree: &SourceTree, node: Node<'_>) -> usize {
    node.child_by_field_name("dimensions")
        .map(|d| tree.text(d).matches('[').count())
        .unwrap_or(0)
}

fn parameters_of(tree: &SourceTree, params: Option<Node<'_>>, frame: &Frame) -> Vec<String> {
    let Some(params) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for param in named_children(params) {
        match param.kind() {
            "formal_parameter" => {
                if let Some(ty) = param.child_by_field_name("type") {
                    out.push(erased_type(tree, ty, dims_of(tree, param), frame));
                }
            }
            "spread_parameter" => {
                let ty = named_children(param).into_iter().find(|n| {
                    !matches!(
                        n.kind(),
                        "modifiers" | "variable_declarator" | "marker_annotation" | "annotation"
                    )
                });
                if let Some(ty) = ty {
                    out.push(erased_type(tree, ty, 1, frame));
                }
            }
            _ => {}
        }
    }
    out
}

fn method_of(
    tree: &SourceTree,
    node: Node<'_>,
    owner: ClassKind,
    frame: &mut Frame,
) -> Option<MethodDescriptor> {
    let name = tree.text(node.child_by_field_name("name")?).to_string();
    let saved = frame.type_vars.len();
    push_type_parameters(tree, node, frame);

    let return_type = node
        .child_by_field_name("type")
        .map(|t| erased_type(tree, t, dims_of(tree, node), frame))
        .unwrap_or_else(|| "void".to_string());
    let parameters = parameters_of(tree, node.child_by_field_name("parameters"), frame);
    let (mut modifiers, annotations) = modifiers_of(tree, node);
    frame.type_vars.truncate(saved);

    if owner == ClassKind::Interface {
        let has_body = node.child_by_field_name("body").is_some();
        let private = modifiers.contains("private");
        if !private {
            modifiers.insert("public");
        }
        if !has_body && !private && !modifiers.contains("static") {
            modifiers.insert("abstract");
        }
        modifiers.remove("default");
    }

    Some(MethodDescriptor {
        name,
        parameters,
        return_type,
        modifiers,
        annotations,
    })
}

fn constructor_of(
    tree: &SourceTree,
    node: Node<'_>,
    class_name: &str,
    owner: ClassKind,
    frame: &mut Frame,
) -> Option<ConstructorDescriptor> {
    let saved = frame.type_vars.len();
    push_type_parameters(tree, node, frame);
    let parameters = parameters_of(tree, node.child_by_field_name("parameters"), frame);
    frame.type_vars.truncate(saved);

    let (mut modifiers, annotations) = modifiers_of(tree, node);
    if owner == ClassKind::Enum {
        modifiers.insert("private");
    }
    Some(ConstructorDescriptor {
        class_name: class_name.to_string(),
        parameters,
        modifiers,
        annotations,
    })
}

fn attributes_of(
    tree: &SourceTree,
    node: Node<'_>,
    owner: ClassKind,
    frame: &Frame,
) -> Vec<AttributeDescriptor> {
    let Some(ty) = node.child_by_field_name("type") else {
        return Vec::new();
    };
    let (mut modifiers, annotations) = modifiers_of(tree, node);
    if owner == ClassKind::Interface {
        for implicit in ["public", "static", "final"] {
            modifiers.insert(implicit);
        }
    }

    let mut cursor = node.walk();
    let declarators: Vec<_> = node.children_by_field_name("declarator", &mut cursor).collect();
    declarators
        .into_iter()
        .filter_map(|declarator| {
            let name = declarator.child_by_field_name("name")?;
            Some(AttributeDescriptor {
                name: tree.text(name).to_string(),
                type_name: erased_type(tree, ty, dims_of(tree, declarator), frame),
                modifiers: modifiers.clone(),
                annotations: annotations.clone(),
            })
        })
        .collect()
}

fn add_record_members(
    tree: &SourceTree,
    node: Node<'_>,
    class: &mut ClassDescriptor,
    compact: Option<Node<'_>>,
    frame: &Frame,
) {
    let mut component_types = Vec::new();
    let components = node
        .child_by_field_name("parameters")
        .map(named_children)
        .unwrap_or_default();
    for component in components {
        if component.kind() != "formal_parameter" {
            continue;
        }
        let (Some(name), Some(ty)) = (
            component.child_by_field_name("name"),
            component.child_by_field_name("type"),
        ) else {
            continue;
        };
        let name = tree.text(name);
        let ty = erased_type(tree, ty, dims_of(tree, component), frame);

        if !class.attributes.iter().any(|a| a.name == name) {
            class
                .attributes
                .push(AttributeDescriptor::new(name, &ty).with_modifiers(["private", "final"]));
        }
        if !class
            .methods
            .iter()
            .any(|m| m.name == name && m.parameters.is_empty())
        {
            class
                .methods
                .push(MethodDescriptor::new(name, &[], &ty).with_modifiers(["public"]));
        }
        component_types.push(ty);
    }

    let declared = class
        .constructors
        .iter()
        .any(|c| parameters_match(&c.parameters, &component_types));
    if !declared {
        let (modifiers, annotations) = match compact {
            Some(compact) => modifiers_of(tree, compact),
            None => (visibility_of(&class.modifiers), Vec::new()),
        };
        class.constructors.push(ConstructorDescriptor {
            class_name: class.simple_name.clone(),
            parameters: component_types,
            modifiers,
            annotations,
        });
    }
}

fn add_enum_members(class: &mut ClassDescriptor) {
    let name = class.simple_name.clone();
    let values = format!("{name}[]");
    class
        .methods
        .push(MethodDescriptor::new("values", &[], &values).with_modifiers(["public", "static"]));
    class.methods.push(
        MethodDescriptor::new("valueOf", &["String"], &name).with_modifiers(["public", "static"]),
    );
    for constant in class.enum_values.clone() {
        let field = AttributeDescriptor::new(&constant, &name);
        class
            .attributes
            .push(field.with_modifiers(["public", "static", "final"]));
    }
    if class.constructors.is_empty() {
        class
            .constructors
            .push(ConstructorDescriptor::new(&name, &[]).with_modifiers(["private"]));
    }
}
