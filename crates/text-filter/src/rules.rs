//! Stateless rule engine over normalized text
//!
//! The catalog is a static, ordered list of rules; evaluation walks it in
//! order and stops at the first hit. Higher-severity categories sit earlier
//! in the list so the reason shown to the user names the worst violation.
//!
//! Statelessness is a correctness contract here: every rule is evaluated
//! with `regex::Regex::is_match` or substring search, neither of which
//! carries match-position state between calls, and the compiled catalog is
//! immutable and shared. Two concurrent evaluations can never observe each
//! other.

use crate::normalize::NormalizedText;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Errors that can occur building the rule catalog
#[derive(Debug, Error)]
pub enum FilterError {
    /// A rule pattern failed to compile
    #[error("Invalid rule pattern '{pattern}': {source}")]
    InvalidRule {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        source: regex::Error,
    },
}

/// Result type for catalog construction
pub type Result<T> = std::result::Result<T, FilterError>;

/// Policy category a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// General profanity
    Profanity,
    /// Slurs targeting protected groups
    Slur,
    /// Threats of violence
    Violence,
    /// Self-harm incitement
    SelfHarm,
    /// Explicit sexual content
    Sexual,
    /// Body-shaming and targeted harassment
    Bullying,
    /// Personally identifiable information
    Pii,
    /// External links and domains
    Link,
}

impl RuleCategory {
    /// Stable string form used in decisions and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Profanity => "profanity",
            RuleCategory::Slur => "slur",
            RuleCategory::Violence => "violence",
            RuleCategory::SelfHarm => "self-harm",
            RuleCategory::Sexual => "sexual",
            RuleCategory::Bullying => "bullying",
            RuleCategory::Pii => "pii",
            RuleCategory::Link => "link",
        }
    }
}

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low-risk content (links, mild matches)
    Low,
    /// Policy violation without immediate safety risk
    Medium,
    /// High-risk content (slurs, threats, self-harm, sexual, PII)
    High,
}

/// How a rule inspects the normalized text
enum Matcher {
    /// Word-boundary regex evaluated against the spaced variant
    Word(Regex),
    /// Substring evaluated against the tight variant (separator evasion)
    Evasion(&'static str),
    /// Spaced-out letters (`p u t a`) evaluated against the spaced variant
    SpacedOut(Regex),
    /// Free-form regex evaluated against the spaced variant (PII, links)
    Pattern(Regex),
}

/// One entry in the ordered rule catalog
pub struct PatternRule {
    category: RuleCategory,
    severity: Severity,
    reason: &'static str,
    matcher: Matcher,
}

impl PatternRule {
    fn hits(&self, text: &NormalizedText) -> bool {
        match &self.matcher {
            Matcher::Word(re) => re.is_match(&text.spaced),
            Matcher::Evasion(term) => text.tight.contains(term),
            Matcher::SpacedOut(re) => re.is_match(&text.spaced),
            Matcher::Pattern(re) => re.is_match(&text.spaced),
        }
    }

    /// Category this rule enforces
    pub fn category(&self) -> RuleCategory {
        self.category
    }

    /// Severity assigned on a hit
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// A rule hit with everything the gateway needs to build a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Category of the matched rule
    pub category: RuleCategory,
    /// Severity of the matched rule
    pub severity: Severity,
    /// User-facing reason string
    pub reason: &'static str,
}

fn word(category: RuleCategory, severity: Severity, reason: &'static str, pattern: &str) -> Result<PatternRule> {
    Ok(PatternRule {
        category,
        severity,
        reason,
        matcher: Matcher::Word(compile(pattern)?),
    })
}

fn evasion(category: RuleCategory, severity: Severity, reason: &'static str, term: &'static str) -> PatternRule {
    PatternRule {
        category,
        severity,
        reason,
        matcher: Matcher::Evasion(term),
    }
}

fn spaced_out(category: RuleCategory, severity: Severity, reason: &'static str, term: &str) -> Result<PatternRule> {
    // Each letter separated by arbitrary whitespace: `p u t a`
    let letters: Vec<String> = term.chars().map(|c| regex::escape(&c.to_string())).collect();
    let pattern = format!(r"\b{}\b", letters.join(r"\s+"));
    Ok(PatternRule {
        category,
        severity,
        reason,
        matcher: Matcher::SpacedOut(compile(&pattern)?),
    })
}

fn pattern(category: RuleCategory, severity: Severity, reason: &'static str, pattern: &str) -> Result<PatternRule> {
    Ok(PatternRule {
        category,
        severity,
        reason,
        matcher: Matcher::Pattern(compile(pattern)?),
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| FilterError::InvalidRule {
        pattern: pattern.to_string(),
        source,
    })
}

const REASON_PROFANITY: &str = "That language isn't allowed here.";
const REASON_SLUR: &str = "Hateful language isn't allowed here.";
const REASON_VIOLENCE: &str = "Threats aren't allowed here.";
const REASON_SELF_HARM: &str = "Messages encouraging self-harm aren't allowed.";
const REASON_SEXUAL: &str = "Sexual content isn't allowed here.";
const REASON_BULLYING: &str = "Be kind. Insults aren't allowed here.";
const REASON_PII: &str = "Please don't share personal information like phone or ID numbers.";
const REASON_LINK: &str = "Links can't be shared here.";

/// Build the ordered rule catalog
///
/// Ordering is the priority: slurs and safety-critical rules first, links
/// last, because the first matching rule decides the reason the user sees.
pub fn build_catalog() -> Result<Vec<PatternRule>> {
    Ok(vec![
        // Slurs
        word(RuleCategory::Slur, Severity::High, REASON_SLUR, r"\b(nigg(er|a)s?|fag(got)?s?|trann(y|ies))\b")?,
        evasion(RuleCategory::Slur, Severity::High, REASON_SLUR, "nigger"),
        evasion(RuleCategory::Slur, Severity::High, REASON_SLUR, "faggot"),
        spaced_out(RuleCategory::Slur, Severity::High, REASON_SLUR, "faggot")?,
        // Self-harm incitement
        word(RuleCategory::SelfHarm, Severity::High, REASON_SELF_HARM, r"\b(kys|kill yourself|go die|end your life|unalive yourself)\b")?,
        evasion(RuleCategory::SelfHarm, Severity::High, REASON_SELF_HARM, "killyourself"),
        // Threats
        word(RuleCategory::Violence, Severity::High, REASON_VIOLENCE, r"\b(kill you|beat you up|hurt you|stab you|shoot you)\b")?,
        // Sexual content
        word(RuleCategory::Sexual, Severity::High, REASON_SEXUAL, r"\b(porn\w*|nudes|sexting|onlyfans|send nudes)\b")?,
        evasion(RuleCategory::Sexual, Severity::High, REASON_SEXUAL, "porno"),
        evasion(RuleCategory::Sexual, Severity::High, REASON_SEXUAL, "sendnudes"),
        spaced_out(RuleCategory::Sexual, Severity::High, REASON_SEXUAL, "porno")?,
        // Profanity
        word(RuleCategory::Profanity, Severity::Medium, REASON_PROFANITY, r"\b(fuck\w*|shit\w*|bitch\w*|asshole|wanker|puta|mierda|merda)\b")?,
        evasion(RuleCategory::Profanity, Severity::Medium, REASON_PROFANITY, "puta"),
        spaced_out(RuleCategory::Profanity, Severity::Medium, REASON_PROFANITY, "puta")?,
        // Bullying / body-shaming
        word(RuleCategory::Bullying, Severity::Medium, REASON_BULLYING, r"\b(fatso|lard\w*|retard\w*|nobody likes you|ugly (pig|cow|rat))\b")?,
        // PII: bare 9-digit identifiers
        pattern(RuleCategory::Pii, Severity::High, REASON_PII, r"\b\d{9}\b")?,
        // PII: common phone groupings
        pattern(RuleCategory::Pii, Severity::High, REASON_PII, r"\b\d{3}[-. ]\d{3}[-. ]\d{4}\b|\b\(\d{3}\)\s?\d{3}[-. ]?\d{4}\b")?,
        // Links and bare domains
        pattern(RuleCategory::Link, Severity::Low, REASON_LINK, r"https?://\S+|\bwww\.\S+|\b[a-z0-9][a-z0-9-]*\.(com|net|org|io|gg|xyz)\b")?,
    ])
}

static CATALOG: LazyLock<Vec<PatternRule>> =
    LazyLock::new(|| build_catalog().expect("built-in rule catalog compiles"));

/// The shared built-in catalog
pub fn catalog() -> &'static [PatternRule] {
    &CATALOG
}

/// Evaluate the catalog against normalized text, first match wins
pub fn match_text(text: &NormalizedText) -> Option<RuleMatch> {
    catalog().iter().find(|rule| rule.hits(text)).map(|rule| RuleMatch {
        category: rule.category,
        severity: rule.severity,
        reason: rule.reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn check(text: &str) -> Option<RuleMatch> {
        match_text(&normalize(text))
    }

    #[test]
    fn test_catalog_builds() {
        assert!(build_catalog().is_ok());
        assert!(!catalog().is_empty());
    }

    #[test]
    fn test_plain_profanity() {
        let hit = check("eres una puta").unwrap();
        assert_eq!(hit.category, RuleCategory::Profanity);
        assert_eq!(hit.severity, Severity::Medium);
    }

    #[test]
    fn test_separator_evasion() {
        let hit = check("p.u.t.a").unwrap();
        assert_eq!(hit.category, RuleCategory::Profanity);

        let hit = check("p-u-t-a").unwrap();
        assert_eq!(hit.category, RuleCategory::Profanity);
    }

    #[test]
    fn test_spaced_out_evasion() {
        let hit = check("p u t a").unwrap();
        assert_eq!(hit.category, RuleCategory::Profanity);
    }

    #[test]
    fn test_leetspeak_evasion() {
        let hit = check("look at this p0rn0").unwrap();
        assert_eq!(hit.category, RuleCategory::Sexual);
        assert_eq!(hit.severity, Severity::High);
    }

    #[test]
    fn test_accent_evasion() {
        let hit = check("pútá").unwrap();
        assert_eq!(hit.category, RuleCategory::Profanity);
    }

    #[test]
    fn test_self_harm() {
        let hit = check("just kys already").unwrap();
        assert_eq!(hit.category, RuleCategory::SelfHarm);
        assert_eq!(hit.severity, Severity::High);
    }

    #[test]
    fn test_first_match_wins_priority() {
        // Contains both a slur and profanity; the slur rule sits earlier
        let hit = check("you faggot piece of shit").unwrap();
        assert_eq!(hit.category, RuleCategory::Slur);
    }

    #[test]
    fn test_pii_nine_digits() {
        let hit = check("my number is 123456789 ok").unwrap();
        assert_eq!(hit.category, RuleCategory::Pii);
    }

    #[test]
    fn test_pii_phone_grouping() {
        let hit = check("call me at 555-123-4567").unwrap();
        assert_eq!(hit.category, RuleCategory::Pii);

        let hit = check("call me at (555) 123-4567").unwrap();
        assert_eq!(hit.category, RuleCategory::Pii);
    }

    #[test]
    fn test_links() {
        let hit = check("join https://example.com/party").unwrap();
        assert_eq!(hit.category, RuleCategory::Link);

        let hit = check("find me on chatsite.gg").unwrap();
        assert_eq!(hit.category, RuleCategory::Link);
    }

    #[test]
    fn test_benign_corpus_allowed() {
        let benign = [
            "Hola, esto es genial!",
            "I scored 3 goals today",
            "See you at 7pm",
            "That movie was great, 10/10",
            "my cat is named Oreo",
        ];
        for text in benign {
            assert!(check(text).is_none(), "false positive on: {text}");
        }
    }

    #[test]
    fn test_stateless_repeated_evaluation() {
        // Same input must produce the same result on every call
        for _ in 0..3 {
            assert!(check("p.u.t.a").is_some());
            assert!(check("hello world").is_none());
        }
    }
}
