//! Snapshot comparison between a stored batch and a freshly extracted one
//!
//! Records are compared as whole values. Web pages carry no revision marker,
//! so a dataset whose page changed shows up as one deleted and one added
//! record, and `changed` only ever holds records present unchanged in both
//! snapshots.

use serde::Serialize;
use std::collections::HashSet;

use crate::model::DatasetRecord;

/// Records to add, remove and refresh in the stored catalogue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynchronizationResult {
    pub added: Vec<DatasetRecord>,
    pub deleted: Vec<DatasetRecord>,
    pub changed: Vec<DatasetRecord>,
    /// Catalogue size after the sync, when the stored dataset count is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_total: Option<usize>,
}

impl SynchronizationResult {
    /// Catalogue size after applying this result to `known_count` datasets
    pub fn expected_count(&self, known_count: usize) -> usize {
        (known_count + self.added.len()).saturating_sub(self.deleted.len())
    }
}

/// Classify `current` against `previous`
///
/// `known_count` is the dataset count the catalogue currently reports; it
/// feeds `expected_total`. Duplicates inside one snapshot are reported once,
/// in first-seen order.
pub fn diff(
    previous: &[DatasetRecord],
    current: &[DatasetRecord],
    known_count: Option<usize>,
) -> SynchronizationResult {
    let previous_set: HashSet<&DatasetRecord> = previous.iter().collect();
    let current_set: HashSet<&DatasetRecord> = current.iter().collect();

    let mut result = SynchronizationResult::default();

    let mut seen = HashSet::new();
    for record in current {
        if !seen.insert(record) {
            continue;
        }
        if previous_set.contains(record) {
            result.changed.push(record.clone());
        } else {
            result.added.push(record.clone());
        }
    }

    let mut seen = HashSet::new();
    for record in previous {
        if seen.insert(record) && !current_set.contains(record) {
            result.deleted.push(record.clone());
        }
    }

    result.expected_total = known_count.map(|known| result.expected_count(known));

    tracing::info!(
        added = result.added.len(),
        deleted = result.deleted.len(),
        changed = result.changed.len(),
        expected_count = result.expected_total,
        "Compared catalogue snapshots"
    );

    result
}
