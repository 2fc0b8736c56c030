// src/tracker/classify.rs

//! Commission status classification.
//!
//! Decides Open vs Closed for one snapshot. Pure function of the snapshot,
//! the vendor's display name, and the configured patterns; touches no shared
//! mutable state, so it is safe to invoke concurrently across many vendors.

use std::collections::HashMap;
use std::sync::Arc;

use regex::RegexBuilder;

use crate::error::{ParserError, Result};
use crate::models::{PatternsConfig, Snapshot, Status};

use super::extract::Extractor;
use super::patterns::{CompiledPattern, Variant, VariantEngine};

/// Placeholder substituted for the vendor's own display name so that a name
/// containing status vocabulary never influences the match.
const NAME_PLACEHOLDER: &str = "studio_name";

/// Status classifier with precompiled pattern sets.
pub struct StatusParser {
    extractor: Extractor,
    open_patterns: Vec<Arc<CompiledPattern>>,
    closed_patterns: Vec<Arc<CompiledPattern>>,
    false_positives: Vec<Arc<CompiledPattern>>,
    translations: HashMap<(String, String), String>,
}

impl StatusParser {
    /// Compile every configured (template, variant) pairing.
    ///
    /// Fails fast on malformed syntax, before any fetch occurs.
    pub fn new(patterns: &PatternsConfig) -> Result<Self> {
        let extractor = Extractor::new(patterns)?;

        let mut engine = VariantEngine::new(&patterns.replacements);
        let open_patterns = engine.materialize_set(&patterns.status_templates, &Variant::open())?;
        let closed_patterns =
            engine.materialize_set(&patterns.status_templates, &Variant::closed())?;
        let false_positives =
            engine.materialize_set(&patterns.false_positives, &Variant::any())?;

        let translations = patterns
            .group_translations
            .iter()
            .map(|t| ((t.group.clone(), t.matched.clone()), t.display.clone()))
            .collect();

        Ok(Self {
            extractor,
            open_patterns,
            closed_patterns,
            false_positives,
            translations,
        })
    }

    /// Decide the commission status advertised by one snapshot.
    pub fn parse(
        &self,
        snapshot: &Snapshot,
        vendor_name: &str,
    ) -> std::result::Result<Status, ParserError> {
        let texts = snapshot
            .all_contents()
            .iter()
            .map(|body| self.prepare(&snapshot.url, vendor_name, body))
            .collect::<std::result::Result<Vec<_>, ParserError>>()?;

        let open = self.matches_any(&texts, &self.open_patterns);
        let closed = self.matches_any(&texts, &self.closed_patterns);

        match (open, closed) {
            (true, false) => Ok(Status::Open),
            (false, true) => Ok(Status::Closed),
            (true, true) => Err(ParserError::AmbiguousMatch),
            (false, false) => Err(ParserError::NoMatch),
        }
    }

    /// Compiled OPEN pattern set.
    pub fn open_patterns(&self) -> &[Arc<CompiledPattern>] {
        &self.open_patterns
    }

    /// Compiled CLOSED pattern set.
    pub fn closed_patterns(&self) -> &[Arc<CompiledPattern>] {
        &self.closed_patterns
    }

    /// Compiled false-positive pattern set.
    pub fn false_positive_patterns(&self) -> &[Arc<CompiledPattern>] {
        &self.false_positives
    }

    fn prepare(
        &self,
        url: &str,
        vendor_name: &str,
        body: &str,
    ) -> std::result::Result<String, ParserError> {
        let text = self.extractor.extract(url, body)?;
        let text = neutralize_vendor_name(vendor_name, &text);
        Ok(self.strip_false_positives(&text))
    }

    fn strip_false_positives(&self, text: &str) -> String {
        self.false_positives
            .iter()
            .fold(text.to_string(), |acc, pattern| pattern.remove_from(&acc))
    }

    fn matches_any(&self, texts: &[String], patterns: &[Arc<CompiledPattern>]) -> bool {
        for text in texts {
            for pattern in patterns {
                if pattern.matches(text) {
                    if let Some(matched) = pattern.capture(text, "status") {
                        let display = self
                            .translations
                            .get(&("status".to_string(), matched.to_string()))
                            .map(String::as_str)
                            .unwrap_or(matched);
                        log::debug!("pattern '{}' matched '{matched}' ({display})", pattern.template());
                    }
                    return true;
                }
            }
        }
        false
    }
}

/// Replace case-insensitive occurrences of the vendor's display name with a
/// neutral token, including the possessive form of a name ending in "s"
/// ("Silvers" also neutralizes "Silver's").
fn neutralize_vendor_name(name: &str, text: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return text.to_string();
    }

    let mut result = replace_all_ignore_case(text, name);

    let ends_with_s = name
        .chars()
        .next_back()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'s'));
    if name.len() > 2 && ends_with_s {
        let possessive = format!("{}'s", &name[..name.len() - 1]);
        result = replace_all_ignore_case(&result, &possessive);
    }

    result
}

fn replace_all_ignore_case(text: &str, needle: &str) -> String {
    let pattern = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .expect("escaped literal is always a valid pattern");
    pattern.replace_all(text, NAME_PLACEHOLDER).into_owned()
}
