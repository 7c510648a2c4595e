//! Moderation decisions and submission surfaces

use serde::{Deserialize, Serialize};
use text_filter::Severity;

/// Where a piece of content was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Comment on a post
    Comment,
    /// Direct or group chat message
    Chat,
    /// Feed post
    Post,
}

impl Surface {
    /// Stable string form used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Comment => "comment",
            Surface::Chat => "chat",
            Surface::Post => "post",
        }
    }
}

/// The outcome of inspecting one piece of content
///
/// Created and discarded per call, never persisted. `fallback` marks a
/// decision made under infrastructure failure rather than genuine content
/// inspection, so observers can distinguish "looked fine" from "could not
/// look".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationDecision {
    /// Whether the content may be published
    pub allowed: bool,
    /// User-facing reason when disallowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Policy categories detected in the content
    #[serde(default)]
    pub categories: Vec<String>,
    /// Severity of the worst detected category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// True when the decision was made under infrastructure failure
    #[serde(default)]
    pub fallback: bool,
}

impl ModerationDecision {
    /// Content passed inspection
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            categories: Vec::new(),
            severity: None,
            fallback: false,
        }
    }

    /// Content rejected by policy
    pub fn rejected(reason: impl Into<String>, category: impl Into<String>, severity: Severity) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            categories: vec![category.into()],
            severity: Some(severity),
            fallback: false,
        }
    }

    /// Allowed because the inspecting infrastructure failed (fail-open)
    pub fn fallback_allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            categories: Vec::new(),
            severity: None,
            fallback: true,
        }
    }

    /// Blocked because the inspecting infrastructure failed (fail-closed)
    pub fn fallback_blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            categories: Vec::new(),
            severity: None,
            fallback: true,
        }
    }

    /// Whether this decision reflects genuine content inspection
    pub fn is_genuine(&self) -> bool {
        !self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_as_str() {
        assert_eq!(Surface::Comment.as_str(), "comment");
        assert_eq!(Surface::Chat.as_str(), "chat");
        assert_eq!(Surface::Post.as_str(), "post");
    }

    #[test]
    fn test_allowed_decision() {
        let d = ModerationDecision::allowed();
        assert!(d.allowed);
        assert!(d.is_genuine());
        assert!(d.reason.is_none());
    }

    #[test]
    fn test_rejected_decision() {
        let d = ModerationDecision::rejected("not allowed", "profanity", Severity::Medium);
        assert!(!d.allowed);
        assert!(d.is_genuine());
        assert_eq!(d.categories, vec!["profanity"]);
        assert_eq!(d.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_fallback_decisions() {
        let open = ModerationDecision::fallback_allowed();
        assert!(open.allowed);
        assert!(!open.is_genuine());

        let closed = ModerationDecision::fallback_blocked("try again later");
        assert!(!closed.allowed);
        assert!(!closed.is_genuine());
    }

    #[test]
    fn test_serialization_camel_case() {
        let d = ModerationDecision::fallback_allowed();
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"fallback\":true"));
        assert!(json.contains("\"allowed\":true"));
    }
}
