//! Deterministic text canonicalization for rule matching
//!
//! Normalization is a pure function of its input: no configuration, no
//! hidden state, no I/O. The pipeline order matters and is fixed:
//! lowercase → strip diacritics → drop invisible characters → collapse
//! whitespace → leetspeak substitution → separator stripping.
//!
//! The output carries two variants of the same text. `spaced` keeps word
//! boundaries for phrase and PII rules; `tight` additionally removes
//! separator characters used to camouflage banned words (`p.u.t.a`).

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Characters treated as camouflage separators when they sit between letters
const SEPARATORS: [char; 5] = ['.', '-', '_', '*', '+'];

/// Canonical forms of a piece of text
///
/// Both variants are derived, never persisted. Normalization is idempotent:
/// feeding either variant back through [`normalize`] reproduces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedText {
    /// Canonical text with single-space word boundaries preserved
    pub spaced: String,
    /// Canonical text with inter-letter separators removed
    pub tight: String,
}

/// Normalize text into its canonical matching forms
///
/// # Examples
/// ```
/// use text_filter::normalize;
///
/// let n = normalize("P.U.T.A");
/// assert_eq!(n.spaced, "p.u.t.a");
/// assert_eq!(n.tight, "puta");
///
/// let n = normalize("p0rn0");
/// assert_eq!(n.spaced, "porno");
/// ```
pub fn normalize(text: &str) -> NormalizedText {
    let lowered = lowercase(text);
    let stripped = strip_marks(&lowered);
    let collapsed = collapse_whitespace(&stripped);
    let spaced = apply_leet(&collapsed);
    let tight = strip_separators(&spaced);

    NormalizedText { spaced, tight }
}

/// Unicode-aware lowercasing
fn lowercase(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Decompose (NFD) and drop combining marks, zero-width characters, and
/// control characters
///
/// Accents are camouflage in this context (`pútá` must match `puta`), and
/// zero-width joiners are invisible separators.
fn strip_marks(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !c.is_control())
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'))
        .collect()
}

/// Collapse runs of whitespace to single spaces
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }

    out
}

/// Map a leetspeak character to the letter it stands in for
fn leet_substitute(c: char) -> Option<char> {
    match c {
        '0' => Some('o'),
        '1' => Some('i'),
        '3' => Some('e'),
        '4' => Some('a'),
        '5' => Some('s'),
        '7' => Some('t'),
        '@' => Some('a'),
        '$' => Some('s'),
        '!' => Some('i'),
        _ => None,
    }
}

/// Apply the leetspeak substitution table
///
/// A substitution only fires when the character touches a letter, so digit
/// runs survive intact for the PII rules (`p0rn0` maps, `123456789` does
/// not).
fn apply_leet(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());

    for (i, &c) in chars.iter().enumerate() {
        let substituted = leet_substitute(c).filter(|_| {
            let prev_is_letter = i > 0 && chars[i - 1].is_alphabetic();
            let next_is_letter = chars.get(i + 1).is_some_and(|n| n.is_alphabetic());
            prev_is_letter || next_is_letter
        });
        out.push(substituted.unwrap_or(c));
    }

    out
}

fn is_separator(c: char) -> bool {
    c == ' ' || SEPARATORS.contains(&c)
}

/// Remove separator runs that sit between two letters
///
/// Leading, trailing, and digit-adjacent separators are not camouflage and
/// are kept, so phone groupings and sentence punctuation survive.
fn strip_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if is_separator(chars[i]) {
            let run_start = i;
            while i < chars.len() && is_separator(chars[i]) {
                i += 1;
            }
            let before_is_letter = run_start > 0 && chars[run_start - 1].is_alphabetic();
            let after_is_letter = chars.get(i).is_some_and(|c| c.is_alphabetic());
            if !(before_is_letter && after_is_letter) {
                out.extend(&chars[run_start..i]);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}
