//! Redaction of failure details before a report leaves the grading host.

/// Rewrites human-facing report text.
pub trait Redactor: Send + Sync {
    fn redact(&self, text: &str) -> String;
}

/// Leaves text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Redactor for PassThrough {
    fn redact(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Replaces every occurrence of a set of sensitive fragments (hidden test
/// package names, absolute paths of the grading workspace, ...).
///
/// # Example
/// ```
/// use oracle::{PrefixRedactor, Redactor};
///
/// let redactor = PrefixRedactor::new(["/srv/grader/"]);
/// assert_eq!(redactor.redact("/srv/grader/Foo.java"), "<redacted>Foo.java");
/// ```
#[derive(Debug, Clone)]
pub struct PrefixRedactor {
    /// Longest first, so nested fragments are replaced whole.
    fragments: Vec<String>,
    replacement: String,
}

impl PrefixRedactor {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fragments: Vec<String> = fragments
            .into_iter()
            .map(Into::into)
            .filter(|f| !f.is_empty())
            .collect();
        fragments.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        fragments.dedup();
        Self {
            fragments,
            replacement: "<redacted>".to_string(),
        }
    }

    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.replacement = replacement.to_string();
        self
    }
}

impl Redactor for PrefixRedactor {
    fn redact(&self, text: &str) -> String {
        self.fragments
            .iter()
            .fold(text.to_string(), |acc, fragment| {
                acc.replace(fragment.as_str(), &self.replacement)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Facet;
    use crate::report::{Discrepancy, EntryReport, FacetVerdict, Mismatch, VerificationReport};

    #[test]
    fn test_longest_fragment_wins() {
        let redactor = PrefixRedactor::new(["secret", "secret.hidden"]).with_replacement("***");
        assert_eq!(redactor.redact("secret.hidden.Foo and secret.Bar"), "***.Foo and ***.Bar");
        assert_eq!(PassThrough.redact("secret"), "secret");
    }

    #[test]
    fn test_report_redaction_covers_messages_and_values() {
        let mut report = VerificationReport::default();
        report.insert(EntryReport::resolved(
            "a.Foo",
            vec![FacetVerdict::from_discrepancies(
                Facet::Attributes,
                vec![Discrepancy::new(
                    Facet::Attributes,
                    "helper",
                    Mismatch::Type {
                        expected: "HiddenType".into(),
                        found: "int".into(),
                    },
                )],
            )],
        ));
        report.insert(EntryReport::misconfigured("a.Bar", "HiddenType entry declares nothing"));

        let redacted = report.redacted(&PrefixRedactor::new(["HiddenType"]));
        let foo = redacted.get("a.Foo").unwrap();
        let d = foo.discrepancies().next().unwrap();
        assert!(!d.message.contains("HiddenType"));
        assert_eq!(
            d.mismatch,
            Mismatch::Type {
                expected: "<redacted>".into(),
                found: "int".into()
            }
        );
        assert!(!redacted.to_json().unwrap().contains("HiddenType"));
        assert!(report.to_json().unwrap().contains("HiddenType"), "original untouched");
    }
}
