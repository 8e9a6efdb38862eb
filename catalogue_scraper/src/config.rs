//! Per-source selector configuration
//!
//! A source is described by an ordered list of named selector rules. Rules
//! whose name starts with `distribution_` target distribution fields, either
//! with an explicit block index (`distribution_0_title`) or applied across a
//! repeated block (`distribution_title`). Every other rule targets a dataset
//! field by its bare name.

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::dates::DateNormalizer;
use crate::error::{Result, ScrapeError};

/// Prefix shared by every distribution-scoped rule name
pub const DISTRIBUTION_PREFIX: &str = "distribution_";

/// Text that is the label of the block following the title, never a title itself
pub const TITLE_SENTINEL: &str = "Referente :";

/// Stop values used when a source does not configure its own
pub const DEFAULT_STOP_VALUES: &[&str] = &["N/A", "n/a", "-", "null", "undefined"];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static STATIC_DISTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^distribution_(\d+)_(\w+)$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DYNAMIC_DISTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^distribution_(\w+)$").expect("valid regex"));

/// How a rule reads a value from each matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    #[serde(alias = "SelectorText")]
    Text,
    #[serde(alias = "SelectorElementAttribute")]
    Attribute,
    /// Accepted in configuration but not evaluated yet
    #[serde(alias = "SelectorLink")]
    Link,
}

/// Single named extraction rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRule {
    /// Target field, e.g. `title` or `distribution_0_downloadURL`
    pub name: String,
    /// CSS selector evaluated against the page
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: SelectorKind,
    /// Attribute to read; required for `attribute` rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_attribute: Option<String>,
    /// Refinement applied to extracted text, first match wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Values that invalidate this rule's result (title rules)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_values: Vec<String>,
}

impl SelectorRule {
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            kind: SelectorKind::Text,
            extract_attribute: None,
            regex: None,
            stop_values: vec![],
        }
    }

    pub fn attribute(
        name: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            kind: SelectorKind::Attribute,
            extract_attribute: Some(attribute.into()),
            ..Self::text(name, selector)
        }
    }

    pub fn link(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Link,
            ..Self::text(name, selector)
        }
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_stop_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Selector configuration of one catalogue source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default)]
    pub catalogue_id: String,
    pub rules: Vec<SelectorRule>,
    /// Titles that mark a page as not describing a dataset
    #[serde(default = "default_stop_values")]
    pub stop_values: Vec<String>,
    /// Offset of the source's local time, used when normalizing dates
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Last known number of datasets in the catalogue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_count: Option<usize>,
}

fn default_stop_values() -> Vec<String> {
    DEFAULT_STOP_VALUES.iter().map(|s| s.to_string()).collect()
}

impl SourceConfig {
    pub fn new(catalogue_id: impl Into<String>, rules: Vec<SelectorRule>) -> Self {
        Self {
            catalogue_id: catalogue_id.into(),
            rules,
            stop_values: default_stop_values(),
            utc_offset_minutes: 0,
            dataset_count: None,
        }
    }

    /// Parse a source configuration from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which record field a rule writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Dataset,
    /// Rule bound to one indexed distribution block
    StaticDistribution { index: usize, field: String },
    /// Rule applied across every repeated distribution block
    DynamicDistribution { field: String },
}

/// Validated rule with its selector and pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: SelectorRule,
    expression: String,
    selector: Selector,
    regex: Option<Regex>,
    target: RuleTarget,
}

impl CompiledRule {
    pub fn compile(rule: SelectorRule) -> Result<Self> {
        let name = rule.name.trim();
        if name.is_empty() {
            return Err(ScrapeError::rule(&rule.name, "rule name is empty"));
        }

        if rule.kind == SelectorKind::Attribute
            && rule
                .extract_attribute
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            return Err(ScrapeError::rule(
                name,
                "attribute rules require extractAttribute",
            ));
        }

        let expression = strip_quotes(&rule.selector);
        let selector = Selector::parse(&expression).map_err(|e| {
            ScrapeError::rule(name, format!("selector '{expression}' does not parse: {e:?}"))
        })?;

        let regex = match rule.regex.as_deref().filter(|r| !r.trim().is_empty()) {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|e| ScrapeError::rule(name, format!("invalid regex: {e}")))?,
            ),
            None => None,
        };

        let target = classify(name)?;

        Ok(Self {
            rule,
            expression,
            selector,
            regex,
            target,
        })
    }

    pub fn name(&self) -> &str {
        self.rule.name.trim()
    }

    pub fn kind(&self) -> SelectorKind {
        self.rule.kind
    }

    pub fn extract_attribute(&self) -> Option<&str> {
        self.rule.extract_attribute.as_deref()
    }

    /// Selector text with literal quotes removed
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    pub fn stop_values(&self) -> &[String] {
        &self.rule.stop_values
    }

    /// Whether extracted values are wrapped download calls
    pub fn is_download_url(&self) -> bool {
        self.name().contains("downloadURL")
    }
}

/// Classify a rule name into its target
fn classify(name: &str) -> Result<RuleTarget> {
    if !name.starts_with(DISTRIBUTION_PREFIX) {
        return Ok(RuleTarget::Dataset);
    }

    if let Some(caps) = STATIC_DISTRIBUTION.captures(name) {
        let index = caps[1]
            .parse::<usize>()
            .map_err(|e| ScrapeError::rule(name, format!("invalid distribution index: {e}")))?;
        return Ok(RuleTarget::StaticDistribution {
            index,
            field: caps[2].to_string(),
        });
    }

    match DYNAMIC_DISTRIBUTION.captures(name) {
        Some(caps) => Ok(RuleTarget::DynamicDistribution {
            field: caps[1].to_string(),
        }),
        None => Err(ScrapeError::rule(
            name,
            "expected distribution_<index>_<field> or distribution_<field>",
        )),
    }
}

/// Remove literal single quotes pages embed in selector arguments
pub fn strip_quotes(expression: &str) -> String {
    expression.replace('\'', "")
}

/// Compiled rules of one source, shared read-only by every extraction
#[derive(Debug, Clone)]
pub struct RuleSet {
    catalogue_id: String,
    distribution_rules: Vec<CompiledRule>,
    dataset_rules: Vec<CompiledRule>,
    stop_values: HashSet<String>,
    dates: DateNormalizer,
    dataset_count: Option<usize>,
}

impl RuleSet {
    /// Validate every rule of the source; the first invalid rule aborts
    pub fn compile(config: &SourceConfig) -> Result<Self> {
        let mut distribution_rules = Vec::new();
        let mut dataset_rules = Vec::new();

        for rule in &config.rules {
            let compiled = CompiledRule::compile(rule.clone())?;
            match compiled.target() {
                RuleTarget::Dataset => dataset_rules.push(compiled),
                _ => distribution_rules.push(compiled),
            }
        }

        Ok(Self {
            catalogue_id: config.catalogue_id.clone(),
            distribution_rules,
            dataset_rules,
            stop_values: config.stop_values.iter().cloned().collect(),
            dates: DateNormalizer::with_offset_minutes(config.utc_offset_minutes),
            dataset_count: config.dataset_count,
        })
    }

    pub fn catalogue_id(&self) -> &str {
        &self.catalogue_id
    }

    pub fn distribution_rules(&self) -> &[CompiledRule] {
        &self.distribution_rules
    }

    pub fn dataset_rules(&self) -> &[CompiledRule] {
        &self.dataset_rules
    }

    pub fn is_stop_value(&self, value: &str) -> bool {
        self.stop_values.contains(value)
    }

    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    pub fn dataset_count(&self) -> Option<usize> {
        self.dataset_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_from_json() {
        let json = r#"
        {
            "catalogueId": "7",
            "rules": [
                {"name": "title", "selector": "div.title h1", "type": "text"},
                {"name": "distribution_downloadURL", "selector": "a.dl", "type": "SelectorElementAttribute", "extractAttribute": "href"},
                {"name": "distribution_0_format", "selector": "span.fmt", "type": "SelectorText", "regex": "[A-Z]+"}
            ]
        }
        "#;

        let config = SourceConfig::from_json(json).unwrap();
        assert_eq!(config.catalogue_id, "7");
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.rules[1].kind, SelectorKind::Attribute);
        assert_eq!(config.rules[1].extract_attribute.as_deref(), Some("href"));
        assert_eq!(config.rules[2].regex.as_deref(), Some("[A-Z]+"));
        assert!(config.stop_values.contains(&"N/A".to_string()));
        assert_eq!(config.utc_offset_minutes, 0);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SourceConfig::from_json("{\"rules\": 3}").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigParse(_)));
    }

    #[test]
    fn test_rule_targets() {
        let rules = RuleSet::compile(&SourceConfig::new(
            "1",
            vec![
                SelectorRule::text("title", "h1"),
                SelectorRule::text("distribution_12_title", "h2"),
                SelectorRule::attribute("distribution_downloadURL", "a", "href"),
                SelectorRule::text("description", "p"),
            ],
        ))
        .unwrap();

        assert_eq!(rules.dataset_rules().len(), 2);
        assert_eq!(rules.dataset_rules()[0].name(), "title");
        assert_eq!(rules.dataset_rules()[1].name(), "description");
        assert_eq!(
            rules.distribution_rules()[0].target(),
            &RuleTarget::StaticDistribution {
                index: 12,
                field: "title".to_string()
            }
        );
        assert_eq!(
            rules.distribution_rules()[1].target(),
            &RuleTarget::DynamicDistribution {
                field: "downloadURL".to_string()
            }
        );
    }

    #[test]
    fn test_attribute_rule_requires_attribute() {
        let mut rule = SelectorRule::attribute("distribution_downloadURL", "a", "href");
        rule.extract_attribute = None;
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, ScrapeError::RuleConfiguration { .. }));
    }

    #[test]
    fn test_invalid_selector_and_regex_rejected() {
        assert!(CompiledRule::compile(SelectorRule::text("title", "div[[")).is_err());
        assert!(CompiledRule::compile(SelectorRule::text("title", "h1").with_regex("(")).is_err());
        assert!(CompiledRule::compile(SelectorRule::text("distribution_", "h1")).is_err());
    }

    #[test]
    fn test_quotes_stripped_before_parsing() {
        let rule = CompiledRule::compile(SelectorRule::text(
            "title",
            "div[class='dataset'] > h1",
        ))
        .unwrap();
        assert_eq!(rule.expression(), "div[class=dataset] > h1");
    }

    #[test]
    fn test_custom_stop_values_replace_defaults() {
        let mut config = SourceConfig::new("1", vec![]);
        config.stop_values = vec!["Untitled".to_string()];
        let rules = RuleSet::compile(&config).unwrap();
        assert!(rules.is_stop_value("Untitled"));
        assert!(!rules.is_stop_value("N/A"));
    }
}
