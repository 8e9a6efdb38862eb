//! Batch extraction over all pages of a catalogue

use serde::Serialize;
use std::collections::HashMap;

use crate::config::{RuleSet, SourceConfig};
use crate::dataset::extract_dataset;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, ScrapeError};
use crate::model::DatasetRecord;
use crate::page::DatasetPage;

/// Format label for distributions without a known format
pub const UNDEFINED_FORMAT: &str = "undefined";

/// Page that did not produce a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDataset {
    pub url: String,
    pub reason: String,
}

/// Number of distributions sharing one format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatStatistics {
    pub format: String,
    pub count: usize,
}

/// Outcome of extracting one batch of pages
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub datasets: Vec<DatasetRecord>,
    pub skipped: Vec<SkippedDataset>,
    /// Number of pages handed in
    pub total: usize,
    pub diagnostics: Diagnostics,
}

impl BatchReport {
    pub fn accepted_count(&self) -> usize {
        self.datasets.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Distribution formats across all accepted datasets, most frequent first
    pub fn format_statistics(&self) -> Vec<FormatStatistics> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for distribution in self.datasets.iter().flat_map(|d| &d.distributions) {
            let format = distribution.format.trim();
            let format = if format.is_empty() {
                UNDEFINED_FORMAT
            } else {
                format
            };
            *counts.entry(format).or_default() += 1;
        }

        let mut stats: Vec<FormatStatistics> = counts
            .into_iter()
            .map(|(format, count)| FormatStatistics {
                format: format.to_string(),
                count,
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.format.cmp(&b.format)));
        stats
    }
}

/// Extract a dataset from every page, skipping pages that are not datasets
///
/// A page never fails the batch: rejected pages are listed in
/// [`BatchReport::skipped`], so accepted + skipped always equals the number
/// of pages.
pub fn extract_all(pages: &[DatasetPage], rules: &RuleSet) -> BatchReport {
    let mut report = BatchReport {
        total: pages.len(),
        ..BatchReport::default()
    };

    for page in pages {
        let mut diagnostics = Diagnostics::new();
        match extract_dataset(page, rules, &mut diagnostics) {
            Ok(dataset) => report.datasets.push(dataset),
            Err(err) => {
                tracing::info!(url = %page.base_url(), error = %err, "Skipped web dataset");
                let reason = match err {
                    ScrapeError::DatasetNotValid { reason, .. } => reason,
                    other => other.to_string(),
                };
                report.skipped.push(SkippedDataset {
                    url: page.base_url().to_string(),
                    reason,
                });
            }
        }
        report.diagnostics.merge(diagnostics);
    }

    tracing::info!(
        catalogue = %rules.catalogue_id(),
        skipped = report.skipped_count(),
        total = report.total,
        "Skipped web datasets when mapping"
    );
    tracing::info!(
        catalogue = %rules.catalogue_id(),
        accepted = report.accepted_count(),
        total = report.total,
        dropped_values = report.diagnostics.dropped_values(),
        "Final mapped datasets"
    );

    report
}

/// Validate a source configuration, then extract every page with it
///
/// Only an invalid configuration fails; see [`extract_all`].
pub fn extract_catalogue(config: &SourceConfig, pages: &[DatasetPage]) -> Result<BatchReport> {
    let rules = RuleSet::compile(config)?;
    Ok(extract_all(pages, &rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorRule;

    fn pages() -> Vec<DatasetPage> {
        vec![
            DatasetPage::parse(
                r#"<h1>Bus stops</h1><a class="dl" href="https://x.org/stops.csv">csv</a>
                   <a class="dl" href="https://x.org/stops.geojson">geojson</a>"#,
                "https://x.org/ds/1",
            ),
            DatasetPage::parse(r#"<h1>N/A</h1>"#, "https://x.org/ds/2"),
            DatasetPage::parse(
                r#"<h1>Bike lanes</h1><a class="dl" href="https://x.org/lanes.csv">csv</a>
                   <a class="dl" href="https://x.org/download">raw</a>"#,
                "https://x.org/ds/3",
            ),
            DatasetPage::parse(r#"<h1></h1>"#, "https://x.org/ds/4"),
        ]
    }

    fn config() -> SourceConfig {
        SourceConfig::new(
            "11",
            vec![
                SelectorRule::text("title", "h1"),
                SelectorRule::attribute("distribution_downloadURL", "a.dl", "href"),
            ],
        )
    }

    #[test]
    fn test_extract_all_counts() {
        let report = extract_catalogue(&config(), &pages()).unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.accepted_count(), 2);
        assert_eq!(report.skipped_count(), 2);
        assert_eq!(report.accepted_count() + report.skipped_count(), report.total);

        assert_eq!(report.skipped[0].url, "https://x.org/ds/2");
        assert!(report.skipped[0].reason.contains("stop value"));
        assert_eq!(report.skipped[1].url, "https://x.org/ds/4");

        assert_eq!(report.datasets[0].identifier, "https://x.org/ds/1");
        assert_eq!(report.datasets[1].identifier, "https://x.org/ds/3");
    }

    #[test]
    fn test_format_statistics() {
        let report = extract_catalogue(&config(), &pages()).unwrap();
        assert_eq!(
            report.format_statistics(),
            vec![
                FormatStatistics {
                    format: "CSV".to_string(),
                    count: 2
                },
                FormatStatistics {
                    format: "GEOJSON".to_string(),
                    count: 1
                },
                FormatStatistics {
                    format: UNDEFINED_FORMAT.to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_invalid_configuration_aborts() {
        let mut config = config();
        config.rules.push(SelectorRule {
            extract_attribute: None,
            ..SelectorRule::attribute("publisher_uri", "a.pub", "href")
        });

        let err = extract_catalogue(&config, &pages()).unwrap_err();
        assert!(matches!(err, ScrapeError::RuleConfiguration { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let report = extract_catalogue(&config(), &[]).unwrap();
        assert_eq!(report.total, 0);
        assert!(report.datasets.is_empty());
        assert!(report.format_statistics().is_empty());
    }
}
