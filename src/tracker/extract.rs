// src/tracker/extract.rs

//! Site-specific text extraction.
//!
//! Reduces raw fetched content to the text fragment worth classifying:
//! lowercases everything, flattens JSON payloads into plain text, applies the
//! configured HTML-cleaning substitutions, and narrows known site shapes to
//! the DOM sub-region most likely to contain a commission-status statement.

use std::fmt::Write as _;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, ParserError, Result};
use crate::models::PatternsConfig;

use super::sites;

/// Text extractor with precompiled cleaning substitutions.
pub struct Extractor {
    cleaners: Vec<(Regex, String)>,
}

impl Extractor {
    /// Compile the configured cleaning substitutions. Malformed patterns are
    /// fatal at load time.
    pub fn new(patterns: &PatternsConfig) -> Result<Self> {
        let cleaners = patterns
            .html_cleaners
            .iter()
            .map(|s| {
                Regex::new(&s.pattern)
                    .map(|regex| (regex, s.replace_with.clone()))
                    .map_err(|e| {
                        AppError::config(format!("invalid HTML cleaner '{}': {e}", s.pattern))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { cleaners })
    }

    /// Reduce one content body to classifiable text.
    ///
    /// The URL is only used to derive an optional narrowing hint from its
    /// fragment; no network access happens here.
    pub fn extract(&self, url: &str, input: &str) -> std::result::Result<String, ParserError> {
        let text = input.to_lowercase();
        let text = flatten_json(&text);
        let text = self.clean(&text);
        self.narrow(url, text)
    }

    fn clean(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (regex, replacement) in &self.cleaners {
            result = regex.replace_all(&result, replacement.as_str()).into_owned();
        }
        result
    }

    /// Narrow recognized site shapes to their relevant sub-region.
    fn narrow(&self, url: &str, text: String) -> std::result::Result<String, ParserError> {
        if sites::is_fur_affinity(&text) {
            if text.contains(sites::LOGIN_WALL_MARKER) {
                return Err(ParserError::LoginRequired);
            }

            if sites::is_fur_affinity_user_profile(&text) {
                let mut selector = "#page-userpage tr:first-child table.maintable".to_string();
                if filter_hint(url) == Some("profile") {
                    selector.push_str(" td[width=\"80%\"][align=\"left\"]");
                }
                return select_fragment(&text, &selector);
            }

            return Ok(text);
        }

        if sites::is_twitter(&text) {
            return select_fragment(&text, "div.profileheadercard");
        }

        if sites::is_instagram(&text) {
            return select_fragment(&text, "script[type=\"application/ld+json\"]");
        }

        Ok(text)
    }
}

/// Derive an extraction filter hint from the URL fragment (text after `#`).
fn filter_hint(url: &str) -> Option<&str> {
    url.split_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|fragment| !fragment.is_empty())
}

/// Select the first element matching the selector and return its inner HTML.
fn select_fragment(text: &str, selector: &str) -> std::result::Result<String, ParserError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ParserError::FilteringFailed(format!("invalid selector '{selector}': {e:?}")))?;

    let document = Html::parse_document(text);
    document
        .select(&parsed)
        .next()
        .map(|element| element.inner_html())
        .ok_or_else(|| {
            ParserError::FilteringFailed(format!("selector '{selector}' matched nothing"))
        })
}

/// Flatten a JSON document into `"key: value"` lines so API payloads take
/// part in regex matching as plain text. Non-JSON input passes through
/// unchanged.
fn flatten_json(text: &str) -> String {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return text.to_string();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let mut out = String::new();
            flatten_value("", &value, &mut out);
            out
        }
        Err(_) => text.to_string(),
    }
}

fn flatten_value(key: &str, value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_value(k, v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_value(&i.to_string(), v, out);
            }
        }
        Value::String(s) => {
            let _ = writeln!(out, "{key}: {s}");
        }
        other => {
            let _ = writeln!(out, "{key}: {other}");
        }
    }
}
