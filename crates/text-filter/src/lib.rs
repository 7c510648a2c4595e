//! Evasion-resistant text filtering for Harbor
//!
//! This crate provides the local, synchronous half of content moderation:
//! deterministic text canonicalization and a stateless rule engine over the
//! canonical forms. It has no network or persistent state, so callers can
//! run it on every keystroke or submission without suspending.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod normalize;
pub mod rules;

pub use normalize::{normalize, NormalizedText};
pub use rules::{catalog, match_text, RuleCategory, RuleMatch, Severity};
