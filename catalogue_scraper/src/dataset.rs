//! Dataset assembly
//!
//! Turns one page into one [`DatasetRecord`]. Distributions are resolved
//! first because their count decides the shift applied to every
//! `x:nth-of-type(N)` step of the dataset selectors.

use regex::Regex;
use scraper::Selector;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::config::{CompiledRule, RuleSet, SelectorKind, TITLE_SENTINEL};
use crate::dates::DateNormalizer;
use crate::diagnostics::{Diagnostics, Issue};
use crate::distribution::{resolve_distributions, ResolvedDistributions};
use crate::error::{Result, ScrapeError};
use crate::extractors::{extract_values, extract_values_with};
use crate::model::{
    Agent, AgentRole, Concept, ContactPoint, DatasetRecord, DistributionRecord, Location,
    PeriodOfTime, Standard,
};
use crate::page::DatasetPage;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NTH_OF_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w-]+):nth-of-type\((\d+)\)").expect("valid regex"));

/// Extract one dataset record from a page
///
/// Fails with [`ScrapeError::DatasetNotValid`] when the extracted title is
/// blank, a stop value or the label of the next block. Every other problem is
/// recorded in `diagnostics` and leaves the field unset.
pub fn extract_dataset(
    page: &DatasetPage,
    rules: &RuleSet,
    diagnostics: &mut Diagnostics,
) -> Result<DatasetRecord> {
    let resolved = resolve_distributions(page, rules, diagnostics);
    assemble_dataset(page, rules, resolved, diagnostics)
}

/// Evaluate the dataset rules and attach the resolved distributions
pub fn assemble_dataset(
    page: &DatasetPage,
    rules: &RuleSet,
    resolved: ResolvedDistributions,
    diagnostics: &mut Diagnostics,
) -> Result<DatasetRecord> {
    let mut draft = DatasetDraft::default();

    for rule in rules.dataset_rules() {
        if rule.kind() == SelectorKind::Link {
            diagnostics.record(Issue::UnsupportedKind {
                rule: rule.name().to_string(),
            });
            continue;
        }

        let values = match shift_selector(rule.expression(), resolved.shift) {
            Cow::Borrowed(_) => extract_values(page, rule),
            Cow::Owned(shifted) => {
                let parsed = Selector::parse(&shifted).ok();
                match parsed {
                    Some(selector) => extract_values_with(page, rule, &selector),
                    None => {
                        diagnostics.record(Issue::SelectorRejected {
                            rule: rule.name().to_string(),
                            selector: shifted,
                        });
                        continue;
                    }
                }
            }
        };

        if values.is_empty() {
            continue;
        }

        if rule.name() == "title" {
            validate_title(page, rules, rule, &values[0])?;
        }

        draft.apply(rule.name(), values, rules.dates(), diagnostics);
    }

    Ok(draft.finish(page, rules.catalogue_id(), resolved.distributions))
}

/// Move the first `x:nth-of-type(N)` step of a selector by `shift` positions
///
/// Only that step moves. Later steps with the same `(N)` are left alone, where
/// a plain text replacement of `(N)` would rewrite every one of them.
/// Returns the input unchanged when there is nothing to move.
pub fn shift_selector(expression: &str, shift: i32) -> Cow<'_, str> {
    if shift == 0 {
        return Cow::Borrowed(expression);
    }

    let Some(caps) = NTH_OF_TYPE.captures(expression) else {
        return Cow::Borrowed(expression);
    };
    let Ok(position) = caps[2].parse::<i64>() else {
        return Cow::Borrowed(expression);
    };
    let Some(step) = caps.get(0) else {
        return Cow::Borrowed(expression);
    };

    Cow::Owned(format!(
        "{}{}:nth-of-type({}){}",
        &expression[..step.start()],
        &caps[1],
        position + i64::from(shift),
        &expression[step.end()..]
    ))
}

fn validate_title(
    page: &DatasetPage,
    rules: &RuleSet,
    rule: &CompiledRule,
    title: &str,
) -> Result<()> {
    let reason = if title.trim().is_empty() {
        "title is empty".to_string()
    } else if rules.is_stop_value(title) || rule.stop_values().iter().any(|s| s == title) {
        format!("title '{title}' is a stop value")
    } else if title == TITLE_SENTINEL {
        format!("title '{title}' is the label of the following block")
    } else {
        return Ok(());
    };

    Err(ScrapeError::DatasetNotValid {
        url: page.base_url().to_string(),
        reason,
    })
}

#[derive(Debug, Default)]
struct AgentParts {
    uri: Option<String>,
    name: Option<String>,
    mbox: Option<String>,
    homepage: Option<String>,
    agent_type: Option<String>,
    identifier: Option<String>,
}

impl AgentParts {
    fn set(&mut self, field: &str, value: Option<String>) -> bool {
        let slot = match field {
            "uri" => &mut self.uri,
            "name" => &mut self.name,
            "mbox" => &mut self.mbox,
            "homepage" => &mut self.homepage,
            "type" => &mut self.agent_type,
            "identifier" => &mut self.identifier,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn build(self, role: AgentRole) -> Option<Agent> {
        let present = [
            &self.uri,
            &self.name,
            &self.mbox,
            &self.homepage,
            &self.agent_type,
            &self.identifier,
        ]
        .iter()
        .any(|v| v.is_some());

        present.then(|| Agent {
            role,
            uri: self.uri,
            name: self.name,
            mbox: self.mbox,
            homepage: self.homepage,
            agent_type: self.agent_type,
            identifier: self.identifier,
        })
    }
}

#[derive(Debug, Default)]
struct ContactParts {
    uri: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    url: Option<String>,
    telephone: Option<String>,
}

impl ContactParts {
    fn set(&mut self, field: &str, value: Option<String>) -> bool {
        let slot = match field {
            "uri" => &mut self.uri,
            "fn" => &mut self.full_name,
            "email" => &mut self.email,
            "url" => &mut self.url,
            "telephone" => &mut self.telephone,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn build(self) -> Option<ContactPoint> {
        let present = self.uri.is_some() || self.full_name.is_some() || self.email.is_some();
        present.then(|| ContactPoint {
            uri: self.uri,
            full_name: self.full_name,
            email: self.email,
            url: self.url,
            telephone: self.telephone,
        })
    }
}

#[derive(Debug, Default)]
struct StandardParts {
    identifier: Option<String>,
    title: Option<String>,
    description: Option<String>,
    reference_documentation: Option<String>,
}

impl StandardParts {
    fn set(&mut self, field: &str, value: Option<String>) -> bool {
        let slot = match field {
            "identifier" => &mut self.identifier,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "referenceDocumentation" => &mut self.reference_documentation,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn build(self) -> Option<Standard> {
        let present = self.identifier.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.reference_documentation.is_some();
        present.then(|| Standard {
            identifier: self.identifier,
            title: self.title,
            description: self.description,
            reference_documentation: self.reference_documentation,
        })
    }
}

#[derive(Debug, Default)]
struct LocationParts {
    geographical_identifier: Option<String>,
    geographical_name: Option<String>,
    geometry: Option<String>,
}

impl LocationParts {
    fn set(&mut self, field: &str, value: Option<String>) -> bool {
        let slot = match field {
            "geographicalIdentifier" => &mut self.geographical_identifier,
            "geographicalName" => &mut self.geographical_name,
            "geometry" => &mut self.geometry,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn build(self) -> Option<Location> {
        let present = [
            &self.geographical_identifier,
            &self.geographical_name,
            &self.geometry,
        ]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()));

        present.then(|| Location {
            geographical_identifier: self.geographical_identifier,
            geographical_name: self.geographical_name,
            geometry: self.geometry,
        })
    }
}

/// Fields collected while the dataset rules are evaluated
#[derive(Debug, Default)]
struct DatasetDraft {
    title: Option<String>,
    description: Option<String>,
    access_rights: Option<String>,
    frequency: Option<String>,
    landing_page: Option<String>,
    release_date: Option<String>,
    update_date: Option<String>,
    dataset_type: Option<String>,
    version: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    keywords: Vec<String>,
    documentation: Vec<String>,
    has_version: Vec<String>,
    is_version_of: Vec<String>,
    language: Vec<String>,
    provenance: Vec<String>,
    source: Vec<String>,
    sample: Vec<String>,
    version_notes: Vec<String>,
    themes: Vec<Concept>,
    subjects: Vec<Concept>,
    publisher: AgentParts,
    rights_holder: AgentParts,
    creator: AgentParts,
    contact: ContactParts,
    conforms_to: StandardParts,
    spatial: LocationParts,
}

impl DatasetDraft {
    /// Route the values of one rule to their dataset field
    fn apply(
        &mut self,
        name: &str,
        values: Vec<String>,
        dates: &DateNormalizer,
        diagnostics: &mut Diagnostics,
    ) {
        let known = match name.split_once('_') {
            Some(("publisher", field)) => self.publisher.set(field, first(values)),
            Some(("rightsHolder", field)) => self.rights_holder.set(field, first(values)),
            Some(("creator", field)) => self.creator.set(field, first(values)),
            Some(("contact", field)) => self.contact.set(field, first(values)),
            Some(("conformsTo", field)) => self.conforms_to.set(field, first(values)),
            Some(("spatialCoverage", field)) => self.spatial.set(field, first(values)),
            Some(("temporalCoverage", "startDate")) => {
                self.start_date = normalize(name, first(values), dates, diagnostics);
                true
            }
            Some(("temporalCoverage", "endDate")) => {
                self.end_date = normalize(name, first(values), dates, diagnostics);
                true
            }
            _ => self.apply_field(name, values, dates, diagnostics),
        };

        if !known {
            diagnostics.record(Issue::Dispatch {
                rule: name.to_string(),
                field: name.to_string(),
            });
        }
    }

    fn apply_field(
        &mut self,
        name: &str,
        values: Vec<String>,
        dates: &DateNormalizer,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        match name {
            "title" => self.title = first(values),
            "description" => self.description = first(values),
            "accessRights" => self.access_rights = first(values),
            "frequency" => self.frequency = first(values),
            "landingPage" => self.landing_page = first(values),
            "type" => self.dataset_type = first(values),
            "version" => self.version = first(values),
            "releaseDate" => self.release_date = normalize(name, first(values), dates, diagnostics),
            "updateDate" => self.update_date = normalize(name, first(values), dates, diagnostics),
            "keywords" => {
                for keyword in values.iter().flat_map(|v| v.split(',')).map(str::trim) {
                    if !keyword.is_empty() && !self.keywords.iter().any(|k| k == keyword) {
                        self.keywords.push(keyword.to_string());
                    }
                }
            }
            "documentation" => self.documentation.extend(values),
            "hasVersion" => self.has_version.extend(first(values)),
            "isVersionOf" => self.is_version_of.extend(first(values)),
            "language" => self.language.extend(first(values)),
            "provenance" => self.provenance.extend(first(values)),
            "source" => self.source.extend(first(values)),
            "sample" => self.sample.extend(first(values)),
            "versionNotes" => self.version_notes.extend(first(values)),
            "subject" => self.subjects.extend(first(values).map(Concept::new)),
            "theme" => self.themes.extend(
                values
                    .into_iter()
                    .filter(|label| !label.trim().is_empty())
                    .map(Concept::new),
            ),
            _ => return false,
        }
        true
    }

    fn finish(
        self,
        page: &DatasetPage,
        catalogue_id: &str,
        distributions: Vec<DistributionRecord>,
    ) -> DatasetRecord {
        let temporal_coverage = match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
                Some(PeriodOfTime {
                    start_date: start.clone(),
                    end_date: end.clone(),
                })
            }
            _ => None,
        };

        let release_date = self.release_date.filter(|d| is_present(d)).unwrap_or_default();
        let update_date = self
            .update_date
            .filter(|d| is_present(d))
            .unwrap_or_else(|| release_date.clone());
        let landing_page = self
            .landing_page
            .filter(|p| is_present(p))
            .unwrap_or_else(|| page.base_url().to_string());

        DatasetRecord {
            catalogue_id: catalogue_id.to_string(),
            identifier: landing_page.clone(),
            title: self.title,
            description: self.description,
            distributions,
            themes: self.themes,
            subjects: self.subjects,
            publisher: self.publisher.build(AgentRole::Publisher),
            contact_points: self.contact.build().into_iter().collect(),
            keywords: self.keywords,
            access_rights: self.access_rights,
            conforms_to: self.conforms_to.build().into_iter().collect(),
            documentation: self.documentation,
            frequency: self.frequency,
            has_version: self.has_version,
            is_version_of: self.is_version_of,
            landing_page,
            language: self.language,
            provenance: self.provenance,
            release_date,
            update_date,
            sample: self.sample,
            source: self.source,
            spatial_coverage: self.spatial.build(),
            temporal_coverage,
            dataset_type: self.dataset_type,
            version: self.version,
            version_notes: self.version_notes,
            rights_holder: self.rights_holder.build(AgentRole::RightsHolder),
            creator: self.creator.build(AgentRole::Creator),
        }
    }
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().next()
}

fn is_present<S: AsRef<str>>(value: &S) -> bool {
    !value.as_ref().trim().is_empty()
}

/// Normalize a date value; failures are recorded and leave the field unset
fn normalize(
    name: &str,
    value: Option<String>,
    dates: &DateNormalizer,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let value = value?;
    match dates.normalize(name, &value) {
        Ok(date) => Some(date),
        Err(err) => {
            diagnostics.record(Issue::from((name, err)));
            None
        }
    }
}
