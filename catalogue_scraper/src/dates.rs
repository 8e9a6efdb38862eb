//! Date normalization
//!
//! Pages publish dates in whatever format the site likes. Values are parsed
//! against a list of common layouts, interpreted in the source's local
//! offset, and rendered as UTC timestamps.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::error::{Result, ScrapeError};

/// Output layout for every normalized date
pub const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Converts local date strings of one source to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    offset: FixedOffset,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::with_offset_minutes(0)
    }
}

impl DateNormalizer {
    /// Offsets outside ±24h fall back to UTC
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn normalize(&self, field: &str, raw: &str) -> Result<String> {
        let value = raw.trim();
        self.parse(value)
            .map(|dt| dt.format(UTC_FORMAT).to_string())
            .ok_or_else(|| ScrapeError::FieldParse {
                field: field.to_string(),
                value: value.to_string(),
            })
    }

    fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt.with_timezone(&Utc));
        }

        let naive = DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;

        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
