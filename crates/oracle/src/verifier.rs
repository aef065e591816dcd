//! Drives resolution and facet matching for every oracle entry.
//!
//! Each entry walks `Pending -> Resolving -> (NotFound | Resolved) ->
//! FacetChecking -> Done`. A `NotFound` entry produces no facet verdicts.
//! A resolved entry runs every declared facet independently, and verdicts
//! land in the report in [`Facet`] order. One entry never affects another.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use common::descriptor::parameters_match;
use common::{ClassDescriptor, StructureIntrospectable};
use tokio::task::JoinSet;

use crate::entry::{Facet, Oracle, OracleEntry};
use crate::error::ConfigError;
use crate::matchers;
use crate::policy::MatchPolicy;
use crate::report::{EntryReport, FacetVerdict, VerificationReport};
use crate::resolver::{resolve, supertypes, Resolution};

/// Lifecycle of a single oracle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Resolving,
    NotFound,
    Resolved,
    FacetChecking,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "pending",
            Phase::Resolving => "resolving",
            Phase::NotFound => "not_found",
            Phase::Resolved => "resolved",
            Phase::FacetChecking => "facet_checking",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

fn enter(entry: &OracleEntry, phase: Phase) {
    tracing::trace!(class = %entry.qualified_name, %phase, "phase");
}

/// Verifies a candidate program against an [`Oracle`].
#[derive(Debug, Clone)]
pub struct OracleVerifier {
    oracle: Oracle,
    policy: MatchPolicy,
}

impl OracleVerifier {
    pub fn new(oracle: Oracle) -> Self {
        Self {
            oracle,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Checks every declared facet of every entry.
    pub fn verify(&self, program: &dyn StructureIntrospectable) -> VerificationReport {
        let mut report = VerificationReport::default();
        for entry in self.oracle.entries() {
            report.insert(self.verify_entry(program, entry));
        }
        tracing::info!(summary = %report.summary(), "verification finished");
        report
    }

    /// Checks `facet` alone, for the entries that declare it.
    ///
    /// # Errors
    /// `NoEntriesForFacet` if no entry declares `facet`.
    pub fn verify_facet(
        &self,
        program: &dyn StructureIntrospectable,
        facet: Facet,
    ) -> Result<VerificationReport, ConfigError> {
        let mut report = VerificationReport::default();
        for entry in self.oracle.entries_declaring(facet) {
            report.insert(self.check_entry(program, entry, &[facet]));
        }
        if report.is_empty() {
            return Err(ConfigError::NoEntriesForFacet(facet));
        }
        tracing::info!(%facet, summary = %report.summary(), "facet verification finished");
        Ok(report)
    }

    /// Checks all facets `entry` declares. An entry declaring none is
    /// reported as misconfigured.
    pub fn verify_entry(
        &self,
        program: &dyn StructureIntrospectable,
        entry: &OracleEntry,
    ) -> EntryReport {
        self.check_entry(program, entry, &entry.declared_facets())
    }

    /// One named unit per entry declaring `facet`, e.g. `methods[com.example.Foo]`.
    ///
    /// # Errors
    /// `NoEntriesForFacet` if no entry declares `facet`.
    pub fn check_units(&self, facet: Facet) -> Result<Vec<CheckUnit<'_>>, ConfigError> {
        let units: Vec<CheckUnit<'_>> = self
            .oracle
            .entries_declaring(facet)
            .map(|entry| CheckUnit {
                name: format!("{}[{}]", facet, entry.qualified_name),
                facet,
                entry,
                verifier: self,
            })
            .collect();
        if units.is_empty() {
            return Err(ConfigError::NoEntriesForFacet(facet));
        }
        Ok(units)
    }

    /// Verifies entries in parallel on the blocking pool.
    ///
    /// With a `budget`, an entry that runs longer is reported as
    /// `TimedOut`. The blocking task itself cannot be interrupted and
    /// finishes in the background. A panicking entry propagates.
    pub async fn verify_concurrent(
        self: Arc<Self>,
        program: Arc<dyn StructureIntrospectable>,
        budget: Option<Duration>,
    ) -> VerificationReport {
        let mut tasks = JoinSet::new();
        for index in 0..self.oracle.len() {
            let verifier = Arc::clone(&self);
            let program = Arc::clone(&program);
            tasks.spawn(async move {
                let name = verifier.oracle.entries()[index].qualified_name.clone();
                let work = tokio::task::spawn_blocking(move || {
                    let entry = &verifier.oracle.entries()[index];
                    verifier.verify_entry(program.as_ref(), entry)
                });
                let joined = match budget {
                    Some(budget) => match tokio::time::timeout(budget, work).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            tracing::warn!(
                                class = %name,
                                budget_ms = budget.as_millis() as u64,
                                "entry exceeded its budget"
                            );
                            return EntryReport::timed_out(&name, budget);
                        }
                    },
                    None => work.await,
                };
                match joined {
                    Ok(report) => report,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => EntryReport::misconfigured(&name, &e.to_string()),
                }
            });
        }

        let mut report = VerificationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => report.insert(entry),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => tracing::warn!(error = %e, "verification task cancelled"),
            }
        }
        tracing::info!(summary = %report.summary(), "concurrent verification finished");
        report
    }

    fn check_entry(
        &self,
        program: &dyn StructureIntrospectable,
        entry: &OracleEntry,
        facets: &[Facet],
    ) -> EntryReport {
        enter(entry, Phase::Pending);
        if facets.is_empty() {
            tracing::warn!(class = %entry.qualified_name, "oracle entry declares nothing to check");
            enter(entry, Phase::Done);
            return EntryReport::misconfigured(
                &entry.qualified_name,
                "the entry declares no facet to check",
            );
        }

        enter(entry, Phase::Resolving);
        let class = match resolve(program, &entry.qualified_name, &entry.package) {
            Resolution::Found(class) => class,
            Resolution::NotFound => {
                enter(entry, Phase::NotFound);
                tracing::debug!(class = %entry.qualified_name, "class not found");
                enter(entry, Phase::Done);
                return EntryReport::not_found(&entry.qualified_name);
            }
        };
        enter(entry, Phase::Resolved);

        let observed = if self.policy.include_inherited {
            Cow::Owned(with_inherited_members(program, &class))
        } else {
            class
        };

        enter(entry, Phase::FacetChecking);
        let verdicts: Vec<FacetVerdict> = facets
            .iter()
            .filter_map(|facet| self.check_facet(entry, &observed, *facet))
            .collect();
        enter(entry, Phase::Done);
        EntryReport::resolved(&entry.qualified_name, verdicts)
    }

    /// `None` when the entry carries no expectation for `facet`.
    fn check_facet(
        &self,
        entry: &OracleEntry,
        observed: &ClassDescriptor,
        facet: Facet,
    ) -> Option<FacetVerdict> {
        let subject = entry.qualified_name.as_str();
        let policy = &self.policy;
        match facet {
            Facet::Kind => entry
                .kind
                .map(|kind| matchers::match_kind(subject, kind, observed)),
            Facet::Modifiers => entry
                .modifiers
                .as_ref()
                .map(|m| matchers::match_class_modifiers(subject, m, observed)),
            Facet::Annotations => entry
                .annotations
                .as_ref()
                .map(|a| matchers::match_class_annotations(subject, a, observed, policy)),
            Facet::Superclass => entry
                .superclass
                .as_deref()
                .map(|s| matchers::match_superclass(subject, s, observed)),
            Facet::Interfaces => entry
                .interfaces
                .as_ref()
                .map(|i| matchers::match_interfaces(subject, i, observed)),
            Facet::EnumValues => entry
                .enum_values
                .as_ref()
                .map(|v| matchers::match_enum_values(subject, v, observed)),
            Facet::Attributes => entry
                .attributes
                .as_ref()
                .map(|a| matchers::match_attributes(a, &observed.attributes, policy)),
            Facet::Constructors => entry
                .constructors
                .as_ref()
                .map(|c| matchers::match_constructors(c, &observed.constructors, policy)),
            Facet::Methods => entry
                .methods
                .as_ref()
                .map(|m| matchers::match_methods(m, &observed.methods, policy)),
        }
    }
}

/// `class` plus the non-private members of its in-program superclasses that
/// it does not override or hide.
fn with_inherited_members(
    program: &dyn StructureIntrospectable,
    class: &ClassDescriptor,
) -> ClassDescriptor {
    let mut merged = class.clone();
    for parent in supertypes(program, class) {
        for method in parent.methods.iter().filter(|m| !m.modifiers.contains("private")) {
            let overridden = merged
                .methods
                .iter()
                .any(|own| {
                    own.name == method.name
                        && parameters_match(&own.parameters, &method.parameters)
                });
            if !overridden {
                merged.methods.push(method.clone());
            }
        }
        for attribute in parent.attributes.iter().filter(|a| !a.modifiers.contains("private")) {
            if !merged.attributes.iter().any(|own| own.name == attribute.name) {
                merged.attributes.push(attribute.clone());
            }
        }
    }
    merged
}

/// A single facet of a single entry, runnable on its own by a host test
/// harness.
#[derive(Debug, Clone)]
pub struct CheckUnit<'v> {
    pub name: String,
    pub facet: Facet,
    entry: &'v OracleEntry,
    verifier: &'v OracleVerifier,
}

impl CheckUnit<'_> {
    pub fn entry(&self) -> &OracleEntry {
        self.entry
    }

    pub fn run(&self, program: &dyn StructureIntrospectable) -> EntryReport {
        self.verifier.check_entry(program, self.entry, &[self.facet])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{EntryOutcome, Mismatch};
    use common::snapshot::StructureSnapshot;
    use common::{AttributeDescriptor, ClassKind, MethodDescriptor};

    fn foo_class() -> ClassDescriptor {
        ClassDescriptor::new("com.example", "Foo", ClassKind::Class)
            .with_modifiers(["public"])
            .with_superclass("Base")
            .with_method(MethodDescriptor::new("bar", &["int"], "void").with_modifiers(["public"]))
            .with_attribute(AttributeDescriptor::new("size", "int").with_modifiers(["private"]))
    }

    fn program() -> StructureSnapshot {
        StructureSnapshot::from_classes([
            foo_class(),
            ClassDescriptor::new("com.example", "Base", ClassKind::Class)
                .with_modifiers(["public", "abstract"])
                .with_method(
                    MethodDescriptor::new("describe", &[], "String").with_modifiers(["public"]),
                )
                .with_method(
                    MethodDescriptor::new("secret", &[], "void").with_modifiers(["private"]),
                ),
        ])
    }

    fn foo_entry() -> OracleEntry {
        OracleEntry::new("com.example", "Foo")
            .with_kind(ClassKind::Class)
            .with_modifiers(["public"])
            .with_method(MethodDescriptor::new("bar", &["int"], "void").with_modifiers(["public"]))
    }

    #[test]
    fn test_not_found_has_no_facet_verdicts() {
        let oracle = Oracle::new(vec![
            foo_entry(),
            OracleEntry::new("com.example", "Missing").with_kind(ClassKind::Class),
        ])
        .unwrap();
        let report = OracleVerifier::new(oracle).verify(&program());
        let missing = report.get("com.example.Missing").unwrap();
        assert_eq!(missing.outcome, EntryOutcome::NotFound);
        assert!(missing.facets().is_empty());
        assert!(!missing.passed());
        assert!(report.get("com.example.Foo").unwrap().passed());
    }

    #[test]
    fn test_wrong_package_is_not_found() {
        let entry = OracleEntry::new("com.other", "Foo").with_kind(ClassKind::Class);
        let oracle = Oracle::new(vec![entry]).unwrap();
        let report = OracleVerifier::new(oracle).verify(&program());
        assert_eq!(report.get("com.other.Foo").unwrap().outcome, EntryOutcome::NotFound);
    }

    #[test]
    fn test_bar_with_protected_modifier_fails_only_methods() {
        let program = StructureSnapshot::from_classes([ClassDescriptor::new(
            "com.example",
            "Foo",
            ClassKind::Class,
        )
        .with_modifiers(["public"])
        .with_method(
            MethodDescriptor::new("bar", &["int"], "void").with_modifiers(["protected"]),
        )]);
        let oracle = Oracle::new(vec![foo_entry()]).unwrap();
        let report = OracleVerifier::new(oracle).verify(&program);
        let foo = report.get("com.example.Foo").unwrap();

        assert!(foo.facet(Facet::Kind).unwrap().passed);
        assert!(foo.facet(Facet::Modifiers).unwrap().passed);
        let methods = foo.facet(Facet::Methods).unwrap();
        assert_eq!(methods.discrepancies.len(), 1);
        assert!(matches!(methods.discrepancies[0].mismatch, Mismatch::Modifiers { .. }));
    }

    #[test]
    fn test_facet_independence() {
        let entry = foo_entry().with_superclass("Other");
        let oracle = Oracle::new(vec![entry]).unwrap();
        let report = OracleVerifier::new(oracle).verify(&program());
        let foo = report.get("com.example.Foo").unwrap();
        let order: Vec<Facet> = foo.facets().iter().map(|v| v.facet).collect();
        assert_eq!(order, vec![Facet::Kind, Facet::Modifiers, Facet::Superclass, Facet::Methods]);
        assert!(!foo.facet(Facet::Superclass).unwrap().passed);
        assert!(foo.facet(Facet::Methods).unwrap().passed);
    }

    #[test]
    fn test_wrong_class_modifiers_leave_methods_passing() {
        let entry = foo_entry().with_modifiers(["public", "final"]);
        let oracle = Oracle::new(vec![entry]).unwrap();
        let report = OracleVerifier::new(oracle).verify(&program());
        let foo = report.get("com.example.Foo").unwrap();

        let modifiers = foo.facet(Facet::Modifiers).unwrap();
        assert!(!modifiers.passed);
        assert_eq!(
            modifiers.discrepancies[0].mismatch,
            Mismatch::Modifiers {
                missing: vec!["final".into()],
                unexpected: vec![],
            }
        );
        assert!(foo.facet(Facet::Methods).unwrap().passed);
        assert!(foo.facet(Facet::Kind).unwrap().passed);
        assert!(!foo.passed());
    }

    #[test]
    fn test_verification_is_idempotent() {
        let oracle = Oracle::new(vec![
            foo_entry().with_superclass("Other"),
            OracleEntry::new("com.example", "Gone").with_kind(ClassKind::Enum),
        ])
        .unwrap();
        let verifier = OracleVerifier::new(oracle);
        let program = program();
        let first = verifier.verify(&program).to_json().unwrap();
        let second = verifier.verify(&program).to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entry_without_facets_is_misconfigured() {
        let oracle = Oracle::new(vec![OracleEntry::new("com.example", "Foo")]).unwrap();
        let report = OracleVerifier::new(oracle).verify(&program());
        assert!(matches!(
            report.get("com.example.Foo").unwrap().outcome,
            EntryOutcome::Misconfigured { .. }
        ));
    }

    #[test]
    fn test_verify_facet_requires_a_declaring_entry() {
        let verifier = OracleVerifier::new(Oracle::new(vec![foo_entry()]).unwrap());
        let report = verifier.verify_facet(&program(), Facet::Methods).unwrap();
        let foo = report.get("com.example.Foo").unwrap();
        assert_eq!(foo.facets().len(), 1);
        assert_eq!(
            verifier.verify_facet(&program(), Facet::EnumValues).unwrap_err(),
            ConfigError::NoEntriesForFacet(Facet::EnumValues)
        );
    }

    #[test]
    fn test_check_units_are_named_and_runnable() {
        let verifier = OracleVerifier::new(Oracle::new(vec![foo_entry()]).unwrap());
        let units = verifier.check_units(Facet::Methods).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "methods[com.example.Foo]");
        assert_eq!(units[0].entry().simple_name, "Foo");
        let report = units[0].run(&program());
        assert!(report.passed());
        assert_eq!(report.facets().len(), 1);
        assert!(verifier.check_units(Facet::Attributes).is_err());
    }

    #[test]
    fn test_inherited_members_are_opt_in() {
        let entry = OracleEntry::new("com.example", "Foo")
            .with_method(
                MethodDescriptor::new("describe", &[], "String").with_modifiers(["public"]),
            )
            .with_method(MethodDescriptor::new("secret", &[], "void").with_modifiers(["private"]));
        let oracle = Oracle::new(vec![entry]).unwrap();

        let strict = OracleVerifier::new(oracle.clone()).verify(&program());
        let methods = strict.get("com.example.Foo").unwrap().facet(Facet::Methods).unwrap();
        assert_eq!(methods.discrepancies.len(), 2);

        let inherited = OracleVerifier::new(oracle)
            .with_policy(MatchPolicy::default().with_inherited(true))
            .verify(&program());
        let methods = inherited.get("com.example.Foo").unwrap().facet(Facet::Methods).unwrap();
        assert_eq!(methods.discrepancies.len(), 1);
        assert_eq!(methods.discrepancies[0].subject, "secret()");
        assert_eq!(methods.discrepancies[0].mismatch, Mismatch::NotFound);
    }

    struct SlowProgram {
        inner: StructureSnapshot,
        slow: &'static str,
        delay: Duration,
    }

    impl StructureIntrospectable for SlowProgram {
        fn introspect(&self, qualified_name: &str) -> Option<Cow<'_, ClassDescriptor>> {
            if qualified_name == self.slow {
                std::thread::sleep(self.delay);
            }
            self.inner.introspect(qualified_name)
        }

        fn type_names(&self) -> Vec<String> {
            self.inner.type_names()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_matches_sequential() {
        let oracle = Oracle::new(vec![
            foo_entry().with_superclass("Other"),
            OracleEntry::new("com.example", "Base").with_modifiers(["public", "abstract"]),
            OracleEntry::new("com.example", "Gone").with_kind(ClassKind::Record),
        ])
        .unwrap();
        let verifier = Arc::new(OracleVerifier::new(oracle));
        let program: Arc<dyn StructureIntrospectable> = Arc::new(program());

        let sequential = verifier.verify(program.as_ref());
        let concurrent = Arc::clone(&verifier)
            .verify_concurrent(program, Some(Duration::from_secs(30)))
            .await;
        assert_eq!(sequential.to_json().unwrap(), concurrent.to_json().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_budget_overrun_times_out_only_that_entry() {
        let oracle = Oracle::new(vec![
            foo_entry(),
            OracleEntry::new("com.example", "Base").with_kind(ClassKind::Class),
        ])
        .unwrap();
        let program: Arc<dyn StructureIntrospectable> = Arc::new(SlowProgram {
            inner: program(),
            slow: "com.example.Base",
            delay: Duration::from_millis(500),
        });
        let report = Arc::new(OracleVerifier::new(oracle))
            .verify_concurrent(program, Some(Duration::from_millis(50)))
            .await;

        assert_eq!(
            report.get("com.example.Base").unwrap().outcome,
            EntryOutcome::TimedOut { budget_ms: 50 }
        );
        assert!(report.get("com.example.Foo").unwrap().passed());
        assert_eq!(report.summary().timed_out, 1);
    }
}
