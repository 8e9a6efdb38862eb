//! Rule-driven dataset extraction for web catalogues
//!
//! Turns already-fetched dataset pages into normalized dataset records using a
//! per-source list of named CSS selector rules:
//! - Distributions from indexed (static) or repeated (dynamic) page blocks
//! - Positional shift of dataset selectors after extra distribution blocks
//! - Title validation against stop values
//! - Snapshot diff between a stored and a fresh batch

pub mod batch;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod extractors;
pub mod model;
pub mod page;
pub mod sync;

pub use batch::{extract_all, extract_catalogue, BatchReport, FormatStatistics, SkippedDataset};
pub use config::{RuleSet, SelectorKind, SelectorRule, SourceConfig};
pub use dataset::extract_dataset;
pub use diagnostics::{Diagnostics, Issue};
pub use distribution::{resolve_distributions, ResolvedDistributions};
pub use error::{Result, ScrapeError};
pub use model::*;
pub use page::DatasetPage;
pub use sync::{diff, SynchronizationResult};
