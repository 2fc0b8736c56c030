// src/tracker/patterns.rs

//! Regex variant engine.
//!
//! Templates are raw pattern strings containing uppercase placeholder tokens.
//! Materializing a template against a variant resolves its placeholders
//! (variant entries first, then the ordered replacement table, recursively)
//! and compiles the result. Each (template, variant) pairing is compiled once
//! per process and cached; malformed syntax is fatal at load time, before any
//! fetch occurs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::Replacement;

/// Expansion depth cap; exceeding it means the replacement table has a cycle.
const MAX_EXPANSION_DEPTH: usize = 8;

/// A named substitution context used to materialize a template.
#[derive(Debug, Clone)]
pub struct Variant {
    name: String,
    substitutions: HashMap<String, String>,
}

impl Variant {
    pub fn new(name: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            substitutions: pairs
                .iter()
                .map(|(token, value)| (token.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Variant binding `STATUS` to the open vocabulary.
    pub fn open() -> Self {
        Self::new("open", &[("STATUS", "(?P<status>OPEN)")])
    }

    /// Variant binding `STATUS` to the closed vocabulary.
    pub fn closed() -> Self {
        Self::new("closed", &[("STATUS", "(?P<status>CLOSED)")])
    }

    /// Wildcard variant matching either status.
    pub fn any() -> Self {
        Self::new("any", &[("STATUS", "(?P<status>OPEN|CLOSED)")])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, token: &str) -> Option<&str> {
        self.substitutions.get(token).map(String::as_str)
    }
}

/// A template materialized against one variant, ready for matching.
#[derive(Debug)]
pub struct CompiledPattern {
    template: String,
    variant: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Remove every match from the text, leaving a single space so that the
    /// surrounding words do not merge into a new match.
    pub fn remove_from(&self, text: &str) -> String {
        self.regex.replace_all(text, " ").into_owned()
    }

    /// Text captured by a named group in the first match, if any.
    pub fn capture<'t>(&self, text: &'t str, group: &str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|captures| captures.name(group))
            .map(|m| m.as_str())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] => {}",
            self.template,
            self.variant,
            self.regex.as_str()
        )
    }
}

/// One parsed piece of a template.
enum Segment {
    Literal(String),
    Token(String),
}

/// Parse a raw pattern string into literal and placeholder segments.
///
/// A placeholder is a maximal run of uppercase letters and underscores at
/// least two characters long; everything else is literal pattern text.
fn parse_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_uppercase() || c == '_' {
            let mut run = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_uppercase() || c == '_' {
                    run.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if run.len() >= 2 {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Token(run));
            } else {
                literal.push_str(&run);
            }
        } else {
            literal.push(c);
            chars.next();
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Compiles templates against variants, caching each pairing.
pub struct VariantEngine {
    replacements: Vec<(String, String)>,
    cache: HashMap<(String, String), Arc<CompiledPattern>>,
}

impl VariantEngine {
    pub fn new(replacements: &[Replacement]) -> Self {
        Self {
            replacements: replacements
                .iter()
                .map(|r| (r.token.clone(), r.pattern.clone()))
                .collect(),
            cache: HashMap::new(),
        }
    }

    /// Produce the compiled expression for a (template, variant) pairing.
    pub fn materialize(
        &mut self,
        template: &str,
        variant: &Variant,
    ) -> Result<Arc<CompiledPattern>> {
        let key = (template.to_string(), variant.name().to_string());
        if let Some(pattern) = self.cache.get(&key) {
            return Ok(Arc::clone(pattern));
        }

        let expanded = self.expand(template, variant, MAX_EXPANSION_DEPTH)?;
        let regex = RegexBuilder::new(&expanded)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                AppError::config(format!(
                    "invalid pattern '{template}' [{}]: {e}",
                    variant.name()
                ))
            })?;

        let pattern = Arc::new(CompiledPattern {
            template: template.to_string(),
            variant: variant.name().to_string(),
            regex,
        });
        self.cache.insert(key, Arc::clone(&pattern));
        Ok(pattern)
    }

    /// Materialize a whole template set against one variant.
    pub fn materialize_set(
        &mut self,
        templates: &[String],
        variant: &Variant,
    ) -> Result<Vec<Arc<CompiledPattern>>> {
        templates
            .iter()
            .map(|template| self.materialize(template, variant))
            .collect()
    }

    fn expand(&self, raw: &str, variant: &Variant, depth: usize) -> Result<String> {
        if depth == 0 {
            return Err(AppError::config(format!(
                "placeholder expansion too deep in '{raw}' (cycle in replacement table?)"
            )));
        }

        let mut out = String::new();
        for segment in parse_segments(raw) {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Token(token) => {
                    let fragment = variant
                        .lookup(&token)
                        .or_else(|| self.lookup_replacement(&token))
                        .ok_or_else(|| {
                            AppError::config(format!(
                                "unknown placeholder '{token}' in pattern '{raw}'"
                            ))
                        })?;
                    out.push_str(&self.expand(fragment, variant, depth - 1)?);
                }
            }
        }
        Ok(out)
    }

    fn lookup_replacement(&self, token: &str) -> Option<&str> {
        self.replacements
            .iter()
            .find(|(candidate, _)| candidate == token)
            .map(|(_, pattern)| pattern.as_str())
    }
}
