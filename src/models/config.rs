//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and fetching behavior settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Status matching patterns
    #[serde(default)]
    pub patterns: PatternsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Pattern syntax itself is checked when the patterns are compiled; this
    /// only rejects configurations that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.fetcher.max_concurrent == 0 {
            return Err(AppError::validation("fetcher.max_concurrent must be > 0"));
        }
        if self.patterns.replacements.is_empty() {
            return Err(AppError::validation("No pattern replacements defined"));
        }
        if self.patterns.status_templates.is_empty() {
            return Err(AppError::validation("No status templates defined"));
        }
        for template in &self.patterns.status_templates {
            if !template.contains("STATUS") {
                return Err(AppError::validation(format!(
                    "Status template without STATUS placeholder: '{template}'"
                )));
            }
        }
        for template in &self.patterns.false_positives {
            if !template.contains("STATUS") {
                return Err(AppError::validation(format!(
                    "False-positive template without STATUS placeholder: '{template}'"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests during the prefetch phase
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level for log output
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Whether to print per-vendor progress during a run
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            show_progress: defaults::show_progress(),
        }
    }
}

/// Status matching pattern configuration.
///
/// Templates are raw pattern strings containing uppercase placeholders
/// (`STATUS`, `COMMISSIONS`, ...). The `STATUS` placeholder is bound by a
/// variant at compile time; the remaining placeholders come from the ordered
/// replacement table below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsConfig {
    /// Ordered placeholder-to-fragment replacement table
    #[serde(default = "defaults::replacements")]
    pub replacements: Vec<Replacement>,

    /// Templates recognizing a definite status statement
    #[serde(default = "defaults::status_templates")]
    pub status_templates: Vec<String>,

    /// Templates recognizing phrases that merely resemble a status statement
    #[serde(default = "defaults::false_positives")]
    pub false_positives: Vec<String>,

    /// Ordered HTML-cleaning substitutions applied before matching
    #[serde(default = "defaults::html_cleaners")]
    pub html_cleaners: Vec<Substitution>,

    /// Human-readable translations for matched pattern groups
    #[serde(default = "defaults::group_translations")]
    pub group_translations: Vec<GroupTranslation>,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            replacements: defaults::replacements(),
            status_templates: defaults::status_templates(),
            false_positives: defaults::false_positives(),
            html_cleaners: defaults::html_cleaners(),
            group_translations: defaults::group_translations(),
        }
    }
}

/// A placeholder-to-pattern-fragment replacement rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    /// Uppercase placeholder token
    pub token: String,

    /// Regular-expression fragment substituted for the token
    pub pattern: String,
}

/// A regex substitution applied to fetched content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substitution {
    pub pattern: String,
    pub replace_with: String,
}

/// Translation of a matched group value for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTranslation {
    /// Named group the translation applies to
    pub group: String,

    /// Matched text, as it appears in cleaned (lowercased) content
    pub matched: String,

    /// Human-readable display text
    pub display: String,
}

mod defaults {
    use super::{GroupTranslation, Replacement, Substitution};

    // Fetcher defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; comtrack/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        5
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn show_progress() -> bool {
        true
    }

    fn replacement(token: &str, pattern: &str) -> Replacement {
        Replacement {
            token: token.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Placeholder vocabulary shared by all templates.
    ///
    /// Fragments are lowercase; matching is case-insensitive anyway since
    /// content is lowercased during extraction.
    pub fn replacements() -> Vec<Replacement> {
        vec![
            replacement(
                "COMMISSIONS",
                r"\b(?:comm?iss?ions?|comms?|customs?|custom orders?|slots?|quotes?)\b",
            ),
            replacement("OPEN", r"open(?:ed)?\b"),
            replacement("CLOSED", r"close[sd]?\b"),
            replacement("ARE", r"(?:are|is|am|r)\b"),
            replacement("WE", r"\b(?:we|i)\b"),
            replacement("CURRENTLY", r"(?:currently|now|at the moment|atm)\b"),
        ]
    }

    /// Templates recognizing a definite status statement.
    pub fn status_templates() -> Vec<String> {
        [
            "COMMISSIONS ARE (?:CURRENTLY )?STATUS",
            "COMMISSIONS(?: status)?:? STATUS",
            "STATUS for (?:new )?COMMISSIONS",
            "WE ARE (?:CURRENTLY )?STATUS for COMMISSIONS",
            "WE(?:'ve| have)? (?:CURRENTLY )?STATUS COMMISSIONS",
        ]
        .map(String::from)
        .to_vec()
    }

    /// Phrases that look like a status statement but aren't one.
    ///
    /// Matched with the "any" variant and stripped from the text before the
    /// real status matching happens.
    pub fn false_positives() -> Vec<String> {
        [
            "(?:when(?:ever)?|once|if|until|before|after|as soon as) (?:WE ARE |COMMISSIONS ARE |WE |they ARE )?STATUS",
            "(?:will|won'?t|wont|may|might|should|gonna|going to)(?: be)? (?:STATUS|opening|closing)",
            "STATUS (?:soon|later|again|eventually|shortly)",
        ]
        .map(String::from)
        .to_vec()
    }

    fn substitution(pattern: &str, replace_with: &str) -> Substitution {
        Substitution {
            pattern: pattern.to_string(),
            replace_with: replace_with.to_string(),
        }
    }

    /// Ordered HTML-cleaning substitutions.
    ///
    /// Inline markup is stripped so that a phrase split across tags (e.g.
    /// "commissions are <b>open</b>") still matches; structural tags are kept
    /// for DOM narrowing.
    pub fn html_cleaners() -> Vec<Substitution> {
        vec![
            substitution(r"(?s)<script[^>]*>.*?</script>", " "),
            substitution(r"(?s)<style[^>]*>.*?</style>", " "),
            substitution(r"(?s)<!--.*?-->", " "),
            substitution(
                r"</?(?:strong|small|center|span|font|big|em|b|i|u|a)(?:\s[^>]*)?/?>",
                "",
            ),
            substitution(r"(?:\s|&nbsp;|<br\s*/?>)+", " "),
        ]
    }

    /// Display translations for the captured status group.
    pub fn group_translations() -> Vec<GroupTranslation> {
        [
            ("status", "open", "Open"),
            ("status", "opened", "Open"),
            ("status", "close", "Closed"),
            ("status", "closed", "Closed"),
            ("status", "closes", "Closed"),
        ]
        .map(|(group, matched, display)| GroupTranslation {
            group: group.to_string(),
            matched: matched.to_string(),
            display: display.to_string(),
        })
        .to_vec()
    }
}
