//! CSS selector-based extraction
//!
//! Uses the scraper crate to select elements by a rule's selector and read
//! either their text or one of their attributes.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use crate::config::{CompiledRule, SelectorKind};
use crate::page::DatasetPage;

/// Download links hidden behind a script call, e.g. `download('file.csv');`
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DOWNLOAD_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*\(([^)]+)\);*").expect("valid regex"));

/// Extract every value the rule's selector matches
/// Returns an empty list when nothing matches
pub fn extract_values(page: &DatasetPage, rule: &CompiledRule) -> Vec<String> {
    extract_values_with(page, rule, rule.selector())
}

/// Extract every value using a selector other than the rule's own
pub fn extract_values_with(
    page: &DatasetPage,
    rule: &CompiledRule,
    selector: &Selector,
) -> Vec<String> {
    if rule.kind() == SelectorKind::Link {
        return vec![];
    }

    page.document()
        .select(selector)
        .map(|el| read_element(&el, rule))
        .collect()
}

/// Extract the first matching element's value
pub fn extract_value(page: &DatasetPage, rule: &CompiledRule) -> Option<String> {
    if rule.kind() == SelectorKind::Link {
        return None;
    }

    page.document()
        .select(rule.selector())
        .next()
        .map(|el| read_element(&el, rule))
}

fn read_element(el: &ElementRef, rule: &CompiledRule) -> String {
    let value = match rule.kind() {
        SelectorKind::Attribute => rule
            .extract_attribute()
            .and_then(|attr| el.value().attr(attr))
            .unwrap_or_default()
            .to_string(),
        _ => {
            let text = element_text(el);
            match rule.regex().and_then(|re| re.find(&text)) {
                Some(m) => m.as_str().to_string(),
                None => text,
            }
        }
    };

    if rule.is_download_url() {
        unwrap_download_call(&value)
    } else {
        value
    }
}

/// Text content with whitespace runs collapsed
fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pull the argument out of a call-style download link
/// Plain addresses are returned unchanged
pub fn unwrap_download_call(value: &str) -> String {
    match DOWNLOAD_CALL.captures(value) {
        Some(caps) => caps[1].replace(['\'', '"'], "").trim().to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorRule;

    fn compile(rule: SelectorRule) -> CompiledRule {
        CompiledRule::compile(rule).unwrap()
    }

    #[test]
    fn test_text_extract() {
        let page = DatasetPage::parse(
            r#"
        <html>
        <body>
            <div class="price">  $19.99 </div>
            <div class="price">$29.99
                per   unit</div>
        </body>
        </html>
        "#,
            "https://shop.example.org/",
        );

        let rule = compile(SelectorRule::text("description", ".price"));
        let prices = extract_values(&page, &rule);
        assert_eq!(prices, vec!["$19.99", "$29.99 per unit"]);

        assert_eq!(extract_value(&page, &rule).unwrap(), "$19.99");
    }

    #[test]
    fn test_attribute_extract() {
        let page = DatasetPage::parse(
            r#"
        <a class="link" href="/dataset/123">Dataset</a>
        <a class="link">No target</a>
        "#,
            "https://data.example.org/",
        );

        let rule = compile(SelectorRule::attribute("landingPage", "a.link", "href"));
        assert_eq!(extract_values(&page, &rule), vec!["/dataset/123", ""]);
    }

    #[test]
    fn test_regex_refinement() {
        let page = DatasetPage::parse(
            r#"<p class="meta">Last updated: 12/05/2022 by staff</p>
               <p class="meta">no date here</p>"#,
            "https://data.example.org/",
        );

        let rule = compile(
            SelectorRule::text("updateDate", "p.meta").with_regex(r"\d{2}/\d{2}/\d{4}"),
        );
        assert_eq!(
            extract_values(&page, &rule),
            vec!["12/05/2022", "no date here"]
        );
    }

    #[test]
    fn test_download_call_unwrapped() {
        let page = DatasetPage::parse(
            r#"
        <a class="dl" onclick="downloadFile('https://data.example.org/files/a.csv');">CSV</a>
        <a class="dl" onclick="https://data.example.org/files/b.json">JSON</a>
        "#,
            "https://data.example.org/",
        );

        let rule = compile(SelectorRule::attribute(
            "distribution_downloadURL",
            "a.dl",
            "onclick",
        ));
        assert_eq!(
            extract_values(&page, &rule),
            vec![
                "https://data.example.org/files/a.csv",
                "https://data.example.org/files/b.json"
            ]
        );
    }

    #[test]
    fn test_quoted_selector_matches() {
        let page = DatasetPage::parse(
            r#"<div class="title"><h1>Air quality</h1></div>"#,
            "https://data.example.org/",
        );
        let rule = compile(SelectorRule::text("title", "div[class='title'] h1"));
        assert_eq!(extract_values(&page, &rule), vec!["Air quality"]);
    }

    #[test]
    fn test_no_match_and_link_rules_are_empty() {
        let page = DatasetPage::parse(r#"<a href="/x">x</a>"#, "https://data.example.org/");

        let missing = compile(SelectorRule::text("title", "h1.missing"));
        assert!(extract_values(&page, &missing).is_empty());
        assert!(extract_value(&page, &missing).is_none());

        let link = compile(SelectorRule::link("landingPage", "a"));
        assert!(extract_values(&page, &link).is_empty());
        assert!(extract_value(&page, &link).is_none());
    }
}
