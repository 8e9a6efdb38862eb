//! Structured record of values dropped during extraction
//!
//! Unparseable dates, unknown field names and mismatched value
//! counts never fail a document. They are recorded here instead, and logged,
//! so callers can see how much a page lost.

use serde::Serialize;

use crate::error::ScrapeError;

/// One locally recovered extraction problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// Value could not be normalized; the field stays unset
    FieldParse { rule: String, value: String },
    /// Rule name maps to no dataset or distribution field; the value is dropped
    Dispatch { rule: String, field: String },
    /// Dynamic rule matched neither one value nor one per distribution
    CardinalityMismatch {
        rule: String,
        distributions: usize,
        values: usize,
    },
    /// Selector no longer parses after the positional shift
    SelectorRejected { rule: String, selector: String },
    /// Link rules are not evaluated
    UnsupportedKind { rule: String },
}

impl Issue {
    pub fn rule(&self) -> &str {
        match self {
            Issue::FieldParse { rule, .. }
            | Issue::Dispatch { rule, .. }
            | Issue::CardinalityMismatch { rule, .. }
            | Issue::SelectorRejected { rule, .. }
            | Issue::UnsupportedKind { rule } => rule,
        }
    }

    /// Log line for this issue
    pub fn message(&self) -> &'static str {
        match self {
            Issue::FieldParse { .. } => "Unparseable value, field left unset",
            Issue::Dispatch { .. } => "No setter for field",
            Issue::CardinalityMismatch { .. } => {
                "Value count matches neither one nor every distribution, dropped"
            }
            Issue::SelectorRejected { .. } => "Shifted selector does not parse",
            Issue::UnsupportedKind { .. } => "Link rules are not evaluated",
        }
    }

    /// Whether an extracted value was thrown away
    pub fn drops_value(&self) -> bool {
        matches!(
            self,
            Issue::FieldParse { .. } | Issue::Dispatch { .. } | Issue::CardinalityMismatch { .. }
        )
    }
}

impl From<(&str, ScrapeError)> for Issue {
    fn from((rule, err): (&str, ScrapeError)) -> Self {
        match err {
            ScrapeError::FieldParse { value, .. } => Issue::FieldParse {
                rule: rule.to_string(),
                value,
            },
            ScrapeError::Dispatch { field, .. } => Issue::Dispatch {
                rule: rule.to_string(),
                field,
            },
            other => Issue::FieldParse {
                rule: rule.to_string(),
                value: other.to_string(),
            },
        }
    }
}

/// Collected issues of one or more extraction passes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: Issue) {
        let message = issue.message();
        match &issue {
            Issue::FieldParse { rule, value } => {
                tracing::debug!(rule = %rule, value = %value, "{message}");
            }
            Issue::Dispatch { rule, field } => {
                tracing::warn!(rule = %rule, field = %field, "{message}");
            }
            Issue::CardinalityMismatch {
                rule,
                distributions,
                values,
            } => {
                tracing::debug!(rule = %rule, distributions, values, "{message}");
            }
            Issue::SelectorRejected { rule, selector } => {
                tracing::warn!(rule = %rule, selector = %selector, "{message}");
            }
            Issue::UnsupportedKind { rule } => {
                tracing::debug!(rule = %rule, "{message}");
            }
        }
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of extracted values that were discarded
    pub fn dropped_values(&self) -> usize {
        self.issues.iter().filter(|i| i.drops_value()).count()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_values_count() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(Issue::UnsupportedKind {
            rule: "distribution_title".to_string(),
        });
        diagnostics.record(Issue::from((
            "releaseDate",
            ScrapeError::FieldParse {
                field: "releaseDate".to_string(),
                value: "soon".to_string(),
            },
        )));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.dropped_values(), 1);
        assert_eq!(diagnostics.issues()[1].rule(), "releaseDate");
    }

    #[test]
    fn test_dispatch_message_names_no_scope() {
        // Raised for unknown dataset fields as well as distribution fields
        let dataset_field = Issue::Dispatch {
            rule: "checksum".to_string(),
            field: "checksum".to_string(),
        };
        let distribution_field = Issue::Dispatch {
            rule: "distribution_checksum".to_string(),
            field: "checksum".to_string(),
        };

        assert_eq!(dataset_field.message(), "No setter for field");
        assert_eq!(dataset_field.message(), distribution_field.message());
        assert!(!dataset_field.message().contains("distribution"));
    }
}
