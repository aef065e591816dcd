//! Facet matchers: pure `(expected, observed, policy) -> FacetVerdict` functions.
//!
//! Member matchers share one selection rule. Every same-name (for
//! constructors: same-signature) observed member is a candidate and is scored
//! on each sub-facet independently. Exactly one fully matching candidate is a
//! pass; several are an explicit ambiguity; none means the closest candidate's
//! failing sub-facets are reported one by one. "Closest" is the lowest
//! weighted failure score, ties broken by a canonical rendering of the
//! candidate, so the verdict never depends on declaration order.

use common::descriptor::{parameters_match, simple_type_name, types_match};
use common::{
    AnnotationDescriptor, AttributeDescriptor, ClassDescriptor, ClassKind, ConstructorDescriptor,
    MethodDescriptor, ModifierSet,
};

use crate::entry::Facet;
use crate::policy::{AnnotationMode, MatchPolicy};
use crate::report::{Discrepancy, FacetVerdict, Mismatch};

const PARAMETERS_WEIGHT: u32 = 4;
const TYPE_WEIGHT: u32 = 2;
const MODIFIERS_WEIGHT: u32 = 1;
const ANNOTATIONS_WEIGHT: u32 = 1;

/// Superclass names that mean "no explicit superclass".
const IMPLICIT_SUPERCLASSES: &[&str] = &["", "Object", "none"];

struct Scored {
    score: u32,
    key: String,
    failures: Vec<Mismatch>,
}

fn score<T>(
    candidate: &T,
    failures: impl Fn(&T) -> Vec<(u32, Mismatch)>,
    key: impl Fn(&T) -> String,
) -> Scored {
    let weighted = failures(candidate);
    Scored {
        score: weighted.iter().map(|(w, _)| w).sum(),
        key: key(candidate),
        failures: weighted.into_iter().map(|(_, m)| m).collect(),
    }
}

fn judge(facet: Facet, subject: &str, mut scored: Vec<Scored>) -> Vec<Discrepancy> {
    if scored.is_empty() {
        return vec![Discrepancy::new(facet, subject, Mismatch::NotFound)];
    }
    let confirmed = scored.iter().filter(|s| s.failures.is_empty()).count();
    match confirmed {
        1 => Vec::new(),
        0 => {
            scored.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.key.cmp(&b.key)));
            scored
                .swap_remove(0)
                .failures
                .into_iter()
                .map(|m| Discrepancy::new(facet, subject, m))
                .collect()
        }
        count => vec![Discrepancy::new(facet, subject, Mismatch::Ambiguous { count })],
    }
}

/// Missing and unexpected tokens in one mismatch, or `None` if the sets are equal.
pub fn modifier_mismatch(expected: &ModifierSet, observed: &ModifierSet) -> Option<Mismatch> {
    let missing = expected.difference(observed);
    let unexpected = observed.difference(expected);
    if missing.is_empty() && unexpected.is_empty() {
        None
    } else {
        Some(Mismatch::Modifiers {
            missing,
            unexpected,
        })
    }
}

fn annotation_satisfied(
    expected: &AnnotationDescriptor,
    observed: &AnnotationDescriptor,
    policy: &MatchPolicy,
) -> bool {
    expected.type_name == observed.type_name
        && (!policy.compare_annotation_attributes
            || expected
                .attributes
                .iter()
                .all(|a| observed.attribute(&a.key) == Some(a.value.as_str())))
}

/// Compares annotation lists under `policy`; `None` when they agree.
pub fn annotation_mismatch(
    expected: &[AnnotationDescriptor],
    observed: &[AnnotationDescriptor],
    policy: &MatchPolicy,
) -> Option<Mismatch> {
    let mut missing: Vec<String> = expected
        .iter()
        .filter(|e| !observed.iter().any(|o| annotation_satisfied(e, o, policy)))
        .map(ToString::to_string)
        .collect();
    let mut unexpected: Vec<String> = match policy.annotation_mode {
        AnnotationMode::Contains => Vec::new(),
        AnnotationMode::Equal => observed
            .iter()
            .filter(|o| !expected.iter().any(|e| e.type_name == o.type_name))
            .map(ToString::to_string)
            .collect(),
    };
    missing.sort();
    missing.dedup();
    unexpected.sort();
    unexpected.dedup();
    if missing.is_empty() && unexpected.is_empty() {
        None
    } else {
        Some(Mismatch::Annotations {
            missing,
            unexpected,
        })
    }
}

fn annotation_key(annotations: &[AnnotationDescriptor]) -> String {
    let mut rendered: Vec<String> = annotations.iter().map(ToString::to_string).collect();
    rendered.sort();
    rendered.join(" ")
}

fn method_failures(
    expected: &MethodDescriptor,
    observed: &MethodDescriptor,
    policy: &MatchPolicy,
) -> Vec<(u32, Mismatch)> {
    let mut failures = Vec::new();
    if !parameters_match(&expected.parameters, &observed.parameters) {
        failures.push((
            PARAMETERS_WEIGHT,
            Mismatch::Parameters {
                expected: expected.parameters.clone(),
                found: observed.parameters.clone(),
            },
        ));
    }
    if let Some(m) = modifier_mismatch(&expected.modifiers, &observed.modifiers) {
        failures.push((MODIFIERS_WEIGHT, m));
    }
    if let Some(m) = annotation_mismatch(&expected.annotations, &observed.annotations, policy) {
        failures.push((ANNOTATIONS_WEIGHT, m));
    }
    if !types_match(&expected.return_type, &observed.return_type) {
        failures.push((
            TYPE_WEIGHT,
            Mismatch::ReturnType {
                expected: simple_type_name(&expected.return_type),
                found: simple_type_name(&observed.return_type),
            },
        ));
    }
    failures
}

/// Checks every expected method against same-name observed methods.
pub fn match_methods(
    expected: &[MethodDescriptor],
    observed: &[MethodDescriptor],
    policy: &MatchPolicy,
) -> FacetVerdict {
    let mut discrepancies = Vec::new();
    for method in expected {
        let scored = observed
            .iter()
            .filter(|o| o.name == method.name)
            .map(|o| {
                score(
                    o,
                    |c| method_failures(method, c, policy),
                    |c| {
                        format!(
                            "{} {} {} {}",
                            c.signature(),
                            c.return_type,
                            c.modifiers,
                            annotation_key(&c.annotations)
                        )
                    },
                )
            })
            .collect();
        discrepancies.extend(judge(Facet::Methods, &method.signature(), scored));
    }
    FacetVerdict::from_discrepancies(Facet::Methods, discrepancies)
}

fn attribute_failures(
    expected: &AttributeDescriptor,
    observed: &AttributeDescriptor,
    policy: &MatchPolicy,
) -> Vec<(u32, Mismatch)> {
    let mut failures = Vec::new();
    if !types_match(&expected.type_name, &observed.type_name) {
        failures.push((
            TYPE_WEIGHT,
            Mismatch::Type {
                expected: simple_type_name(&expected.type_name),
                found: simple_type_name(&observed.type_name),
            },
        ));
    }
    if let Some(m) = modifier_mismatch(&expected.modifiers, &observed.modifiers) {
        failures.push((MODIFIERS_WEIGHT, m));
    }
    if let Some(m) = annotation_mismatch(&expected.annotations, &observed.annotations, policy) {
        failures.push((ANNOTATIONS_WEIGHT, m));
    }
    failures
}

/// Checks every expected attribute against same-name observed attributes.
pub fn match_attributes(
    expected: &[AttributeDescriptor],
    observed: &[AttributeDescriptor],
    policy: &MatchPolicy,
) -> FacetVerdict {
    let mut discrepancies = Vec::new();
    for attribute in expected {
        let scored = observed
            .iter()
            .filter(|o| o.name == attribute.name)
            .map(|o| {
                score(
                    o,
                    |c| attribute_failures(attribute, c, policy),
                    |c| {
                        format!(
                            "{} {} {} {}",
                            c.name,
                            c.type_name,
                            c.modifiers,
                            annotation_key(&c.annotations)
                        )
                    },
                )
            })
            .collect();
        discrepancies.extend(judge(Facet::Attributes, &attribute.name, scored));
    }
    FacetVerdict::from_discrepancies(Facet::Attributes, discrepancies)
}

/// Checks constructors, identified by parameter signature alone.
pub fn match_constructors(
    expected: &[ConstructorDescriptor],
    observed: &[ConstructorDescriptor],
    policy: &MatchPolicy,
) -> FacetVerdict {
    let mut discrepancies = Vec::new();
    for constructor in expected {
        let scored = observed
            .iter()
            .filter(|o| parameters_match(&constructor.parameters, &o.parameters))
            .map(|o| {
                score(
                    o,
                    |c| {
                        let mut failures = Vec::new();
                        if let Some(m) = modifier_mismatch(&constructor.modifiers, &c.modifiers) {
                            failures.push((MODIFIERS_WEIGHT, m));
                        }
                        if let Some(m) =
                            annotation_mismatch(&constructor.annotations, &c.annotations, policy)
                        {
                            failures.push((ANNOTATIONS_WEIGHT, m));
                        }
                        failures
                    },
                    |c| format!("{} {}", c.modifiers, annotation_key(&c.annotations)),
                )
            })
            .collect();
        discrepancies.extend(judge(Facet::Constructors, &constructor.signature(), scored));
    }
    FacetVerdict::from_discrepancies(Facet::Constructors, discrepancies)
}

pub fn match_kind(subject: &str, expected: ClassKind, observed: &ClassDescriptor) -> FacetVerdict {
    let discrepancies = if expected == observed.kind {
        Vec::new()
    } else {
        vec![Discrepancy::new(
            Facet::Kind,
            subject,
            Mismatch::Kind {
                expected,
                found: observed.kind,
            },
        )]
    };
    FacetVerdict::from_discrepancies(Facet::Kind, discrepancies)
}

pub fn match_class_modifiers(
    subject: &str,
    expected: &ModifierSet,
    observed: &ClassDescriptor,
) -> FacetVerdict {
    let discrepancies = modifier_mismatch(expected, &observed.modifiers)
        .map(|m| vec![Discrepancy::new(Facet::Modifiers, subject, m)])
        .unwrap_or_default();
    FacetVerdict::from_discrepancies(Facet::Modifiers, discrepancies)
}

pub fn match_class_annotations(
    subject: &str,
    expected: &[AnnotationDescriptor],
    observed: &ClassDescriptor,
    policy: &MatchPolicy,
) -> FacetVerdict {
    let discrepancies = annotation_mismatch(expected, &observed.annotations, policy)
        .map(|m| vec![Discrepancy::new(Facet::Annotations, subject, m)])
        .unwrap_or_default();
    FacetVerdict::from_discrepancies(Facet::Annotations, discrepancies)
}

fn explicit_superclass(name: &str) -> Option<String> {
    let simple = simple_type_name(name);
    (!IMPLICIT_SUPERCLASSES.contains(&simple.as_str())).then_some(simple)
}

/// Simple-name superclass comparison; `"Object"` expects none.
pub fn match_superclass(subject: &str, expected: &str, observed: &ClassDescriptor) -> FacetVerdict {
    let expected = explicit_superclass(expected);
    let found = observed.superclass.as_deref().and_then(explicit_superclass);
    let discrepancies = if expected == found {
        Vec::new()
    } else {
        vec![Discrepancy::new(
            Facet::Superclass,
            subject,
            Mismatch::Superclass { expected, found },
        )]
    };
    FacetVerdict::from_discrepancies(Facet::Superclass, discrepancies)
}

/// Every expected interface must be implemented; extra ones are allowed.
pub fn match_interfaces(
    subject: &str,
    expected: &[String],
    observed: &ClassDescriptor,
) -> FacetVerdict {
    let discrepancies = expected
        .iter()
        .filter(|e| !observed.interfaces.iter().any(|o| types_match(e, o)))
        .map(|e| {
            Discrepancy::new(
                Facet::Interfaces,
                subject,
                Mismatch::InterfaceMissing {
                    name: simple_type_name(e),
                },
            )
        })
        .collect();
    FacetVerdict::from_discrepancies(Facet::Interfaces, discrepancies)
}

/// Every expected enum constant must be declared.
pub fn match_enum_values(
    subject: &str,
    expected: &[String],
    observed: &ClassDescriptor,
) -> FacetVerdict {
    let discrepancies = expected
        .iter()
        .filter(|e| !observed.enum_values.iter().any(|o| o == e.trim()))
        .map(|e| {
            Discrepancy::new(
                Facet::EnumValues,
                subject,
                Mismatch::EnumValueMissing {
                    name: e.trim().to_string(),
                },
            )
        })
        .collect();
    FacetVerdict::from_discrepancies(Facet::EnumValues, discrepancies)
}
