//! Distribution resolution
//!
//! Pages list their downloadable files in one of two ways. Static layouts give
//! every file its own block, addressed by rules such as
//! `distribution_0_title`, `distribution_1_title`. Dynamic layouts repeat one
//! block per file and are addressed by unindexed rules such as
//! `distribution_title`; the number of files is only known once the
//! `distribution_downloadURL` rule has been evaluated.
//!
//! The number of resolved distributions also decides how far later dataset
//! blocks moved down the page (the shift).

use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::config::{CompiledRule, RuleSet, RuleTarget, SelectorKind};
use crate::diagnostics::{Diagnostics, Issue};
use crate::extractors::{extract_value, extract_values};
use crate::model::DistributionRecord;
use crate::page::DatasetPage;

/// Field that creates one dynamic distribution per extracted address
pub const DOWNLOAD_URL_FIELD: &str = "downloadURL";

/// Distributions of one page plus the positional shift they cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDistributions {
    pub distributions: Vec<DistributionRecord>,
    pub shift: i32,
}

/// Evaluate every distribution rule of the source against a page
pub fn resolve_distributions(
    page: &DatasetPage,
    rules: &RuleSet,
    diagnostics: &mut Diagnostics,
) -> ResolvedDistributions {
    let catalogue_id = rules.catalogue_id();

    let mut static_records: BTreeMap<usize, DistributionRecord> = BTreeMap::new();
    // Keyed by download address; insertion order is the pairing order
    let mut dynamic_records: IndexMap<String, DistributionRecord> = IndexMap::new();
    let mut deferred: Vec<(&CompiledRule, &str)> = Vec::new();

    for rule in rules.distribution_rules() {
        if rule.kind() == SelectorKind::Link {
            diagnostics.record(Issue::UnsupportedKind {
                rule: rule.name().to_string(),
            });
            continue;
        }

        match rule.target() {
            RuleTarget::StaticDistribution { index, field } => {
                // An index only yields a record once one of its fields has a setter
                let mut record = static_records
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| DistributionRecord::new(catalogue_id));
                let value = extract_value(page, rule).unwrap_or_default();
                if apply(&mut record, rule, field, value, diagnostics) {
                    static_records.insert(*index, record);
                }
            }
            RuleTarget::DynamicDistribution { field } if field == DOWNLOAD_URL_FIELD => {
                // Blank addresses still get a record so later rules pair by position
                for url in extract_values(page, rule) {
                    let mut record = DistributionRecord::new(catalogue_id);
                    record.download_url = url.clone();
                    record.access_url = url.clone();
                    dynamic_records.insert(url, record);
                }
            }
            RuleTarget::DynamicDistribution { field } => deferred.push((rule, field.as_str())),
            RuleTarget::Dataset => {}
        }
    }

    if !dynamic_records.is_empty() {
        for (rule, field) in deferred {
            let values = extract_values(page, rule);
            match values.len() {
                0 => {}
                1 => {
                    for record in dynamic_records.values_mut() {
                        if !apply(record, rule, field, values[0].clone(), diagnostics) {
                            break;
                        }
                    }
                }
                n if n == dynamic_records.len() => {
                    for (record, value) in dynamic_records.values_mut().zip(values) {
                        if !apply(record, rule, field, value, diagnostics) {
                            break;
                        }
                    }
                }
                n => diagnostics.record(Issue::CardinalityMismatch {
                    rule: rule.name().to_string(),
                    distributions: dynamic_records.len(),
                    values: n,
                }),
            }
        }
    }

    let mut distributions: Vec<DistributionRecord> = if dynamic_records.is_empty() {
        static_records.into_values().collect()
    } else {
        dynamic_records.into_values().collect()
    };

    for distribution in &mut distributions {
        if distribution.format.trim().is_empty() {
            distribution.format = format_from_extension(&distribution.download_url);
        }
    }

    let shift = shift_for(distributions.len());
    ResolvedDistributions {
        distributions,
        shift,
    }
}

/// Set one field, recording a dispatch issue when the field is unknown
fn apply(
    record: &mut DistributionRecord,
    rule: &CompiledRule,
    field: &str,
    value: String,
    diagnostics: &mut Diagnostics,
) -> bool {
    match record.set_field(field, value) {
        Ok(()) => true,
        Err(err) => {
            diagnostics.record(Issue::from((rule.name(), err)));
            false
        }
    }
}

/// Positional shift caused by `count` distribution blocks
///
/// Dataset selectors are written against a page with exactly one
/// distribution block; every extra block pushes later blocks one position
/// down, and a page without any pulls them one position up.
pub fn shift_for(count: usize) -> i32 {
    match count {
        0 => -1,
        1 => 0,
        n => i32::try_from(n - 1).unwrap_or(i32::MAX),
    }
}

/// Upper-cased file extension of a download address, or empty
pub fn format_from_extension(download_url: &str) -> String {
    let path = match url::Url::parse(download_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => download_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_uppercase()
        }
        _ => String::new(),
    }
}
