//! Locating oracle classes in the candidate program.

use std::borrow::Cow;
use std::collections::HashSet;

use common::descriptor::{qualify, simple_type_name};
use common::{ClassDescriptor, StructureIntrospectable};

/// Outcome of a lookup. Absence is a normal verdict, not an error.
#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    Found(Cow<'a, ClassDescriptor>),
    NotFound,
}

impl Resolution<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Finds the type whose qualified name is exactly `qualified_name` and whose
/// package is `package`. Case-sensitive; no fuzzy matching.
pub fn resolve<'a>(
    program: &'a dyn StructureIntrospectable,
    qualified_name: &str,
    package: &str,
) -> Resolution<'a> {
    match program.introspect(qualified_name) {
        Some(class) if class.package == package => Resolution::Found(class),
        Some(class) => {
            tracing::debug!(
                class = qualified_name,
                expected_package = package,
                found_package = %class.package,
                "package mismatch"
            );
            Resolution::NotFound
        }
        None => Resolution::NotFound,
    }
}

/// Looks up a type as referenced from `from_package`: as written, then in
/// the same package, then by unique simple name anywhere in the program.
fn lookup_reference<'a>(
    program: &'a dyn StructureIntrospectable,
    from_package: &str,
    name: &str,
) -> Option<Cow<'a, ClassDescriptor>> {
    if let Some(found) = program.introspect(name) {
        return Some(found);
    }
    if let Some(found) = program.introspect(&qualify(from_package, name)) {
        return Some(found);
    }
    let simple = simple_type_name(name);
    let suffix = format!(".{simple}");
    let mut matches = program
        .type_names()
        .into_iter()
        .filter(|n| *n == simple || n.ends_with(&suffix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => program.introspect(&only),
        _ => None,
    }
}

/// The superclass chain of `class` inside the program, nearest first.
///
/// Stops at the first superclass the program does not declare (library
/// types such as `Object` or `Exception`) and never revisits a type, so a
/// cyclic hierarchy in a broken candidate terminates.
pub fn supertypes<'a>(
    program: &'a dyn StructureIntrospectable,
    class: &ClassDescriptor,
) -> Vec<Cow<'a, ClassDescriptor>> {
    let mut chain: Vec<Cow<'a, ClassDescriptor>> = Vec::new();
    let mut visited = HashSet::from([class.qualified_name.clone()]);
    let mut next = class
        .superclass
        .clone()
        .map(|name| (class.package.clone(), name));

    while let Some((package, name)) = next.take() {
        let Some(parent) = lookup_reference(program, &package, &name) else {
            break;
        };
        if !visited.insert(parent.qualified_name.clone()) {
            tracing::warn!(class = %class.qualified_name, "cyclic superclass chain");
            break;
        }
        next = parent
            .superclass
            .clone()
            .map(|name| (parent.package.clone(), name));
        chain.push(parent);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::snapshot::StructureSnapshot;
    use common::ClassKind;

    fn program() -> StructureSnapshot {
        StructureSnapshot::from_classes([
            ClassDescriptor::new("zoo", "Animal", ClassKind::Class).with_superclass("Object"),
            ClassDescriptor::new("zoo", "Cat", ClassKind::Class).with_superclass("Animal"),
            ClassDescriptor::new("zoo.big", "Lion", ClassKind::Class).with_superclass("zoo.Cat"),
            ClassDescriptor::new("loop", "A", ClassKind::Class).with_superclass("B"),
            ClassDescriptor::new("loop", "B", ClassKind::Class).with_superclass("A"),
        ])
    }

    #[test]
    fn test_resolve_exact_name_and_package() {
        let program = program();
        assert!(resolve(&program, "zoo.Cat", "zoo").is_found());
        assert!(!resolve(&program, "zoo.cat", "zoo").is_found());
        assert!(!resolve(&program, "Cat", "").is_found());
        assert!(!resolve(&program, "zoo.Cat", "zoo.big").is_found());
    }

    #[test]
    fn test_supertypes_chain_stops_outside_program() {
        let program = program();
        let lion = program.get("zoo.big.Lion").unwrap().clone();
        let chain: Vec<_> = supertypes(&program, &lion)
            .into_iter()
            .map(|c| c.qualified_name.clone())
            .collect();
        assert_eq!(chain, vec!["zoo.Cat", "zoo.Animal"]);
    }

    #[test]
    fn test_supertypes_cycle_terminates() {
        let program = program();
        let a = program.get("loop.A").unwrap().clone();
        let chain = supertypes(&program, &a);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].qualified_name, "loop.B");
    }
}
