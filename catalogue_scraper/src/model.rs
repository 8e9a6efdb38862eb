//! Dataset and distribution records produced by extraction
//!
//! Records compare structurally: two datasets are equal only when every
//! field, nested distributions included, is equal.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// Downloadable file attached to a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    pub catalogue_id: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(rename = "accessURL")]
    pub access_url: String,
    pub title: String,
    pub description: String,
    pub format: String,
    pub byte_size: String,
    pub release_date: String,
    pub update_date: String,
    pub license: String,
    pub media_type: String,
}

impl DistributionRecord {
    pub fn new(catalogue_id: impl Into<String>) -> Self {
        Self {
            catalogue_id: catalogue_id.into(),
            ..Self::default()
        }
    }

    /// Set a field by the name used in `distribution_*` rules
    pub fn set_field(&mut self, field: &str, value: String) -> Result<()> {
        let slot = match field {
            "downloadURL" => &mut self.download_url,
            "accessURL" => &mut self.access_url,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "format" => &mut self.format,
            "byteSize" => &mut self.byte_size,
            "releaseDate" => &mut self.release_date,
            "updateDate" => &mut self.update_date,
            "license" => &mut self.license,
            "mediaType" => &mut self.media_type,
            _ => {
                return Err(ScrapeError::Dispatch {
                    rule: format!("distribution_{field}"),
                    field: field.to_string(),
                })
            }
        };
        *slot = value;
        Ok(())
    }
}

/// Role an agent plays for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentRole {
    Publisher,
    RightsHolder,
    Creator,
}

/// Organization or person related to a dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub role: AgentRole,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub mbox: Option<String>,
    pub homepage: Option<String>,
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPoint {
    pub uri: Option<String>,
    #[serde(rename = "fn")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub telephone: Option<String>,
}

/// Spatial coverage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub geographical_identifier: Option<String>,
    pub geographical_name: Option<String>,
    pub geometry: Option<String>,
}

/// Temporal coverage, both ends normalized to UTC
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodOfTime {
    pub start_date: String,
    pub end_date: String,
}

/// Standard the dataset conforms to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub reference_documentation: Option<String>,
}

/// Labelled concept used for themes and subjects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub pref_label: String,
}

impl Concept {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            pref_label: label.into(),
        }
    }
}

/// Normalized description of one catalogue dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub catalogue_id: String,
    /// Always equal to `landing_page`
    pub identifier: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub distributions: Vec<DistributionRecord>,
    pub themes: Vec<Concept>,
    pub subjects: Vec<Concept>,
    pub publisher: Option<Agent>,
    pub contact_points: Vec<ContactPoint>,
    pub keywords: Vec<String>,
    pub access_rights: Option<String>,
    pub conforms_to: Vec<Standard>,
    pub documentation: Vec<String>,
    pub frequency: Option<String>,
    pub has_version: Vec<String>,
    pub is_version_of: Vec<String>,
    pub landing_page: String,
    pub language: Vec<String>,
    pub provenance: Vec<String>,
    pub release_date: String,
    pub update_date: String,
    pub sample: Vec<String>,
    pub source: Vec<String>,
    pub spatial_coverage: Option<Location>,
    pub temporal_coverage: Option<PeriodOfTime>,
    #[serde(rename = "type")]
    pub dataset_type: Option<String>,
    pub version: Option<String>,
    pub version_notes: Vec<String>,
    pub rights_holder: Option<Agent>,
    pub creator: Option<Agent>,
}
