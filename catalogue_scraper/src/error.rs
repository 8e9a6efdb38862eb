//! Error types for rule evaluation and dataset assembly.

use thiserror::Error;

/// Errors raised while loading rules or assembling a dataset record
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A selector rule cannot be evaluated as configured.
    #[error("Invalid selector rule '{rule}': {reason}")]
    RuleConfiguration { rule: String, reason: String },

    /// The source configuration document could not be read.
    #[error("Failed to parse source configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The page does not describe a usable dataset and must be skipped.
    #[error("Dataset at {url} is not valid: {reason}")]
    DatasetNotValid { url: String, reason: String },

    /// A field value could not be normalized.
    #[error("Cannot parse value '{value}' for field '{field}'")]
    FieldParse { field: String, value: String },

    /// No setter exists for a distribution field name.
    #[error("Rule '{rule}' targets unknown distribution field '{field}'")]
    Dispatch { rule: String, field: String },
}

impl ScrapeError {
    pub(crate) fn rule(rule: &str, reason: impl Into<String>) -> Self {
        Self::RuleConfiguration {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error only invalidates the current document
    pub fn is_document_level(&self) -> bool {
        matches!(self, Self::DatasetNotValid { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScrapeError::rule("distribution_format", "missing extractAttribute");
        assert!(err.to_string().contains("distribution_format"));
        assert!(err.to_string().contains("missing extractAttribute"));
        assert!(!err.is_document_level());

        let err = ScrapeError::DatasetNotValid {
            url: "https://data.example.org/ds/1".to_string(),
            reason: "empty title".to_string(),
        };
        assert!(err.is_document_level());
    }
}
