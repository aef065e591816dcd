//! Verification results.
//!
//! Everything here serializes deterministically: entries are keyed by
//! qualified name in a `BTreeMap` and facet verdicts follow [`Facet`] order,
//! so the same inputs always render byte-identical JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use common::descriptor::render_parameters;
use common::ClassKind;
use serde::Serialize;

use crate::entry::Facet;
use crate::redact::Redactor;

/// What exactly differs between an expected and an observed member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    NotFound,
    Parameters { expected: Vec<String>, found: Vec<String> },
    Modifiers { missing: Vec<String>, unexpected: Vec<String> },
    Annotations { missing: Vec<String>, unexpected: Vec<String> },
    ReturnType { expected: String, found: String },
    Type { expected: String, found: String },
    Kind { expected: ClassKind, found: ClassKind },
    Superclass { expected: Option<String>, found: Option<String> },
    InterfaceMissing { name: String },
    EnumValueMissing { name: String },
    /// More than one observed member satisfies the expectation.
    Ambiguous { count: usize },
}

impl Mismatch {
    fn map_strings(self, f: &dyn Fn(&str) -> String) -> Self {
        let all = |v: Vec<String>| -> Vec<String> { v.iter().map(|s| f(s)).collect() };
        match self {
            Mismatch::Parameters { expected, found } => Mismatch::Parameters {
                expected: all(expected),
                found: all(found),
            },
            Mismatch::Modifiers { missing, unexpected } => Mismatch::Modifiers {
                missing: all(missing),
                unexpected: all(unexpected),
            },
            Mismatch::Annotations { missing, unexpected } => Mismatch::Annotations {
                missing: all(missing),
                unexpected: all(unexpected),
            },
            Mismatch::ReturnType { expected, found } => Mismatch::ReturnType {
                expected: f(&expected),
                found: f(&found),
            },
            Mismatch::Type { expected, found } => Mismatch::Type {
                expected: f(&expected),
                found: f(&found),
            },
            Mismatch::Superclass { expected, found } => Mismatch::Superclass {
                expected: expected.as_deref().map(f),
                found: found.as_deref().map(f),
            },
            Mismatch::InterfaceMissing { name } => Mismatch::InterfaceMissing { name: f(&name) },
            Mismatch::EnumValueMissing { name } => Mismatch::EnumValueMissing { name: f(&name) },
            other => other,
        }
    }
}

/// One reportable difference, naming the facet and the expected member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub facet: Facet,
    /// The expected member, e.g. `bar(int)`, or the class name for class facets.
    pub subject: String,
    pub mismatch: Mismatch,
    pub message: String,
}

impl Discrepancy {
    pub fn new(facet: Facet, subject: &str, mismatch: Mismatch) -> Self {
        let message = describe(facet, subject, &mismatch);
        Self {
            facet,
            subject: subject.to_string(),
            mismatch,
            message,
        }
    }
}

fn member_noun(facet: Facet) -> &'static str {
    match facet {
        Facet::Methods => "method",
        Facet::Attributes => "attribute",
        Facet::Constructors => "constructor",
        _ => "class",
    }
}

fn list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn describe(facet: Facet, subject: &str, mismatch: &Mismatch) -> String {
    let noun = member_noun(facet);
    match mismatch {
        Mismatch::NotFound => {
            format!("The expected {noun} '{subject}' was not found or is named wrongly.")
        }
        Mismatch::Parameters { expected, found } => format!(
            "The parameters of the expected {noun} '{subject}' are not implemented as expected: \
             expected {}, found {}.",
            render_parameters(expected),
            render_parameters(found)
        ),
        Mismatch::Modifiers { missing, unexpected } => {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing {}", list(missing)));
            }
            if !unexpected.is_empty() {
                parts.push(format!("unexpected {}", list(unexpected)));
            }
            format!(
                "The modifiers of the expected {noun} '{subject}' are not implemented \
                 as expected: {}.",
                parts.join(", ")
            )
        }
        Mismatch::Annotations { missing, unexpected } => {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing {}", list(missing)));
            }
            if !unexpected.is_empty() {
                parts.push(format!("unexpected {}", list(unexpected)));
            }
            format!(
                "The annotations of the expected {noun} '{subject}' are not implemented \
                 as expected: {}.",
                parts.join(", ")
            )
        }
        Mismatch::ReturnType { expected, found } => format!(
            "The return type of the expected method '{subject}' is not implemented as expected: \
             expected {expected}, found {found}."
        ),
        Mismatch::Type { expected, found } => format!(
            "The type of the expected attribute '{subject}' is not implemented as expected: \
             expected {expected}, found {found}."
        ),
        Mismatch::Kind { expected, found } => {
            format!("The type '{subject}' is expected to be a {expected}, but is a {found}.")
        }
        Mismatch::Superclass { expected, found } => format!(
            "The superclass of '{subject}' is not implemented as expected: expected {}, found {}.",
            expected.as_deref().unwrap_or("none"),
            found.as_deref().unwrap_or("none")
        ),
        Mismatch::InterfaceMissing { name } => {
            format!("The class '{subject}' does not implement the interface '{name}'.")
        }
        Mismatch::EnumValueMissing { name } => {
            format!("The enum '{subject}' does not contain the constant '{name}'.")
        }
        Mismatch::Ambiguous { count } => format!(
            "The expected {noun} '{subject}' is matched by {count} members; \
             the declaration is ambiguous."
        ),
    }
}

/// Result of one facet for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetVerdict {
    pub facet: Facet,
    pub passed: bool,
    pub discrepancies: Vec<Discrepancy>,
}

impl FacetVerdict {
    pub fn from_discrepancies(facet: Facet, discrepancies: Vec<Discrepancy>) -> Self {
        Self {
            facet,
            passed: discrepancies.is_empty(),
            discrepancies,
        }
    }
}

/// How an oracle entry ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    /// The class was found and every declared facet was checked.
    Resolved { facets: Vec<FacetVerdict> },
    /// The class does not exist in the candidate; no facet was checked.
    NotFound,
    /// The entry itself is broken (e.g. declares nothing to check).
    Misconfigured { reason: String },
    /// Checking exceeded the per-entry wall-clock budget.
    TimedOut { budget_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub qualified_name: String,
    #[serde(flatten)]
    pub outcome: EntryOutcome,
}

impl EntryReport {
    pub fn resolved(qualified_name: &str, facets: Vec<FacetVerdict>) -> Self {
        Self::with_outcome(qualified_name, EntryOutcome::Resolved { facets })
    }

    pub fn not_found(qualified_name: &str) -> Self {
        Self::with_outcome(qualified_name, EntryOutcome::NotFound)
    }

    pub fn misconfigured(qualified_name: &str, reason: &str) -> Self {
        Self::with_outcome(
            qualified_name,
            EntryOutcome::Misconfigured {
                reason: reason.to_string(),
            },
        )
    }

    pub fn timed_out(qualified_name: &str, budget: Duration) -> Self {
        Self::with_outcome(
            qualified_name,
            EntryOutcome::TimedOut {
                budget_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            },
        )
    }

    fn with_outcome(qualified_name: &str, outcome: EntryOutcome) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            outcome,
        }
    }

    /// `true` only for a resolved class whose every facet passed.
    pub fn passed(&self) -> bool {
        matches!(
            &self.outcome,
            EntryOutcome::Resolved { facets } if facets.iter().all(|f| f.passed)
        )
    }

    /// Facet verdicts; empty unless the class resolved.
    pub fn facets(&self) -> &[FacetVerdict] {
        match &self.outcome {
            EntryOutcome::Resolved { facets } => facets.as_slice(),
            _ => &[],
        }
    }

    pub fn facet(&self, facet: Facet) -> Option<&FacetVerdict> {
        self.facets().iter().find(|v| v.facet == facet)
    }

    pub fn discrepancies(&self) -> impl Iterator<Item = &Discrepancy> {
        self.facets().iter().flat_map(|v| v.discrepancies.iter())
    }
}

/// Per-class results of one verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub entries: BTreeMap<String, EntryReport>,
}

impl VerificationReport {
    pub fn insert(&mut self, entry: EntryReport) {
        self.entries.insert(entry.qualified_name.clone(), entry);
    }

    pub fn get(&self, qualified_name: &str) -> Option<&EntryReport> {
        self.entries.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when every entry passed.
    pub fn passed(&self) -> bool {
        self.entries.values().all(EntryReport::passed)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            entries: self.entries.len(),
            ..ReportSummary::default()
        };
        for entry in self.entries.values() {
            match &entry.outcome {
                EntryOutcome::Resolved { .. } if entry.passed() => summary.passed += 1,
                EntryOutcome::Resolved { .. } => summary.failed += 1,
                EntryOutcome::NotFound => summary.not_found += 1,
                EntryOutcome::Misconfigured { .. } => summary.misconfigured += 1,
                EntryOutcome::TimedOut { .. } => summary.timed_out += 1,
            }
        }
        summary
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// A copy with every human-facing string passed through `redactor`.
    pub fn redacted(&self, redactor: &dyn Redactor) -> Self {
        let f = |s: &str| redactor.redact(s);
        let mut out = self.clone();
        for entry in out.entries.values_mut() {
            match &mut entry.outcome {
                EntryOutcome::Resolved { facets } => {
                    for discrepancy in facets.iter_mut().flat_map(|v| v.discrepancies.iter_mut()) {
                        discrepancy.subject = f(&discrepancy.subject);
                        discrepancy.message = f(&discrepancy.message);
                        discrepancy.mismatch = discrepancy.mismatch.clone().map_strings(&f);
                    }
                }
                EntryOutcome::Misconfigured { reason } => *reason = f(reason.as_str()),
                EntryOutcome::NotFound | EntryOutcome::TimedOut { .. } => {}
            }
        }
        out
    }
}

/// Outcome counts over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub entries: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_found: usize,
    pub misconfigured: usize,
    pub timed_out: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} classes: {} passed, {} failed, {} not found, {} misconfigured, {} timed out",
            self.entries,
            self.passed,
            self.failed,
            self.not_found,
            self.misconfigured,
            self.timed_out
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modifier_miss() -> Discrepancy {
        Discrepancy::new(
            Facet::Methods,
            "bar(int)",
            Mismatch::Modifiers {
                missing: vec!["public".into()],
                unexpected: vec!["protected".into()],
            },
        )
    }

    #[test]
    fn test_discrepancy_message_names_member_and_facet() {
        let d = modifier_miss();
        assert!(d.message.contains("modifiers"));
        assert!(d.message.contains("'bar(int)'"));
        assert!(d.message.contains("missing [public]"));
        assert!(d.message.contains("unexpected [protected]"));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut report = VerificationReport::default();
        report.insert(EntryReport::resolved(
            "a.Ok",
            vec![FacetVerdict::from_discrepancies(Facet::Methods, vec![])],
        ));
        report.insert(EntryReport::resolved(
            "a.Bad",
            vec![FacetVerdict::from_discrepancies(Facet::Methods, vec![modifier_miss()])],
        ));
        report.insert(EntryReport::not_found("a.Gone"));
        report.insert(EntryReport::misconfigured("a.Empty", "no facets"));
        report.insert(EntryReport::timed_out("a.Slow", Duration::from_millis(5)));

        let summary = report.summary();
        assert_eq!(
            summary,
            ReportSummary {
                entries: 5,
                passed: 1,
                failed: 1,
                not_found: 1,
                misconfigured: 1,
                timed_out: 1,
            }
        );
        assert!(!report.passed());
        assert!(report.get("a.Gone").unwrap().facets().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut report = VerificationReport::default();
        report.insert(EntryReport::not_found("a.Gone"));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["entries"]["a.Gone"]["outcome"], "not_found");
        assert_eq!(value["entries"]["a.Gone"]["qualified_name"], "a.Gone");
    }
}
