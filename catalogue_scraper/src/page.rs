//! Parsed dataset page handed over by the crawler

use scraper::Html;

/// One already-fetched dataset page and the address it was fetched from
#[derive(Debug, Clone)]
pub struct DatasetPage {
    document: Html,
    base_url: String,
}

impl DatasetPage {
    pub fn new(document: Html, base_url: impl Into<String>) -> Self {
        Self {
            document,
            base_url: base_url.into(),
        }
    }

    /// Parse raw HTML fetched from `base_url`
    pub fn parse(html: &str, base_url: impl Into<String>) -> Self {
        Self::new(Html::parse_document(html), base_url)
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
