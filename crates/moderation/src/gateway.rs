//! Moderation gateway: one entry point per content submission
//!
//! Orchestrates the suspension gate, the local text filter, the strike
//! ledger, and the delegated image check. Policy outcomes (rejected
//! content, suspended user) are structured results, never errors; only
//! store failures surface as [`GatewayError`].

use crate::decision::{ModerationDecision, Surface};
use crate::strikes::{StoreError, StrikeLedger};
use crate::suspension::SuspensionStateMachine;
use crate::vision::{ImageModerationClient, ImageRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use text_filter::{match_text, normalize};
use thiserror::Error;
use tracing::debug;

/// Errors from the gateway's persistence collaborators
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The strike or suspension store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Outcome of a text submission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVerdict {
    /// Whether the text may be published
    pub allowed: bool,
    /// User-facing reason when disallowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Post-increment strike count, present when a strike was recorded,
    /// so the caller can warn the user before suspension triggers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikes: Option<u32>,
    /// When the user's write-block lifts, if one is in effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended_until: Option<DateTime<Utc>>,
}

impl TextVerdict {
    fn allowed() -> Self {
        Self { allowed: true, reason: None, strikes: None, suspended_until: None }
    }
}

/// Orchestrates moderation for a single content submission
pub struct ModerationGateway {
    ledger: StrikeLedger,
    suspensions: SuspensionStateMachine,
    images: ImageModerationClient,
}

impl ModerationGateway {
    /// Assemble a gateway from its collaborators
    pub fn new(
        ledger: StrikeLedger,
        suspensions: SuspensionStateMachine,
        images: ImageModerationClient,
    ) -> Self {
        Self { ledger, suspensions, images }
    }

    /// Check a text submission
    ///
    /// Fully local and synchronous apart from ledger I/O. A suspended user
    /// is rejected before any content inspection; a rule hit records a
    /// strike and may trigger a suspension, and the returned verdict
    /// carries the post-increment count either way.
    pub async fn check_text(
        &self,
        text: &str,
        surface: Surface,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TextVerdict> {
        let status = self.suspensions.is_suspended(user_id, now).await?;
        if status.suspended {
            return Ok(Self::suspended_verdict(status.until, now));
        }

        let normalized = normalize(text);
        let Some(hit) = match_text(&normalized) else {
            return Ok(TextVerdict::allowed());
        };

        debug!(
            user = %user_id,
            surface = surface.as_str(),
            category = hit.category.as_str(),
            "text submission rejected"
        );

        let count = self.ledger.record_strike(user_id, surface, now).await?;
        let suspended_until = self.suspensions.apply_strike_count(user_id, count, now).await?;

        Ok(TextVerdict {
            allowed: false,
            reason: Some(hit.reason.to_string()),
            strikes: Some(count),
            suspended_until,
        })
    }

    /// Check an image submission
    ///
    /// The suspension gate applies exactly as for text. The vision verdict
    /// never touches the strike ledger: the classifier is an imperfect
    /// third party and is trusted for immediate policy compliance only,
    /// not for escalating punitive state.
    pub async fn check_image(
        &self,
        image: &ImageRef,
        surface: Surface,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ModerationDecision> {
        let status = self.suspensions.is_suspended(user_id, now).await?;
        if status.suspended {
            let verdict = Self::suspended_verdict(status.until, now);
            return Ok(ModerationDecision {
                allowed: false,
                reason: verdict.reason,
                categories: Vec::new(),
                severity: None,
                fallback: false,
            });
        }

        Ok(self.images.check_image(image, surface).await)
    }

    fn suspended_verdict(until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TextVerdict {
        let reason = match until {
            Some(until) => {
                let minutes = (until - now).num_minutes().max(1);
                format!("You can't post right now. Try again in {minutes} minutes.")
            }
            None => "You can't post right now.".to_string(),
        };
        TextVerdict {
            allowed: false,
            reason: Some(reason),
            strikes: None,
            suspended_until: until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strikes::MemoryStrikeStore;
    use crate::suspension::{MemorySuspensionStore, SuspensionPolicy};
    use crate::vision::{FailurePolicy, VisionError, VisionResponse, VisionTransport};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubVision {
        result: fn() -> std::result::Result<VisionResponse, VisionError>,
    }

    #[async_trait]
    impl VisionTransport for StubVision {
        async fn submit(
            &self,
            _request: &crate::vision::VisionRequest,
        ) -> std::result::Result<VisionResponse, VisionError> {
            (self.result)()
        }
    }

    fn gateway_with_vision(
        result: fn() -> std::result::Result<VisionResponse, VisionError>,
    ) -> ModerationGateway {
        let ledger = StrikeLedger::new(Arc::new(MemoryStrikeStore::new()));
        let suspensions = SuspensionStateMachine::new(Arc::new(MemorySuspensionStore::new()));
        let images =
            ImageModerationClient::new(Arc::new(StubVision { result }), FailurePolicy::Open);
        ModerationGateway::new(ledger, suspensions, images)
    }

    fn gateway() -> ModerationGateway {
        gateway_with_vision(|| {
            Ok(VisionResponse { allowed: true, categories: vec![], severity: None, reason: None })
        })
    }

    #[tokio::test]
    async fn test_benign_text_allowed() {
        let g = gateway();
        let verdict = g
            .check_text("Hola, esto es genial!", Surface::Comment, "u1", Utc::now())
            .await
            .unwrap();
        assert!(verdict.allowed);
        assert!(verdict.strikes.is_none());
    }

    #[tokio::test]
    async fn test_violation_records_strike_with_count() {
        let g = gateway();
        let now = Utc::now();

        let verdict = g.check_text("p.u.t.a", Surface::Chat, "u1", now).await.unwrap();
        assert!(!verdict.allowed);
        assert!(verdict.reason.is_some());
        assert_eq!(verdict.strikes, Some(1));
        assert!(verdict.suspended_until.is_none());
    }

    #[tokio::test]
    async fn test_third_strike_suspends() {
        let g = gateway();
        let now = Utc::now();

        g.check_text("puta", Surface::Chat, "u1", now).await.unwrap();
        g.check_text("p0rn0", Surface::Comment, "u1", now).await.unwrap();
        let third = g.check_text("kys", Surface::Post, "u1", now).await.unwrap();

        assert_eq!(third.strikes, Some(3));
        assert!(third.suspended_until.is_some());

        // Follow-up submission is rejected before content inspection
        let verdict = g.check_text("hello friends", Surface::Chat, "u1", now).await.unwrap();
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("Try again"));
        assert!(verdict.strikes.is_none());
    }

    #[tokio::test]
    async fn test_fresh_count_after_suspension_and_window() {
        let g = gateway();
        let now = Utc::now();

        for _ in 0..3 {
            g.check_text("puta", Surface::Chat, "u1", now).await.unwrap();
        }

        // Past both the suspension and the 24h rolling window
        let later = now + chrono::Duration::hours(25);
        let verdict = g.check_text("puta", Surface::Chat, "u1", later).await.unwrap();
        assert!(!verdict.allowed);
        // Counting restarted: this is strike one of a fresh window
        assert_eq!(verdict.strikes, Some(1));
        assert!(verdict.suspended_until.is_none());
    }

    #[tokio::test]
    async fn test_strikes_do_not_cross_users() {
        let g = gateway();
        let now = Utc::now();

        g.check_text("puta", Surface::Chat, "u1", now).await.unwrap();
        let verdict = g.check_text("puta", Surface::Chat, "u2", now).await.unwrap();
        assert_eq!(verdict.strikes, Some(1));
    }

    #[tokio::test]
    async fn test_image_check_does_not_touch_ledger() {
        let g = gateway_with_vision(|| {
            Ok(VisionResponse {
                allowed: false,
                categories: vec!["violence".into()],
                severity: None,
                reason: Some("graphic content".into()),
            })
        });
        let now = Utc::now();

        let decision = g
            .check_image(&ImageRef::Bytes(vec![1]), Surface::Post, "u1", now)
            .await
            .unwrap();
        assert!(!decision.allowed);

        // A rejected image adds no strikes; text counting starts at one
        let verdict = g.check_text("puta", Surface::Chat, "u1", now).await.unwrap();
        assert_eq!(verdict.strikes, Some(1));
    }

    #[tokio::test]
    async fn test_image_fail_open_under_outage() {
        let g = gateway_with_vision(|| Err(VisionError::Status(500)));
        let decision = g
            .check_image(&ImageRef::Url("https://x/a.jpg".into()), Surface::Post, "u1", Utc::now())
            .await
            .unwrap();
        assert!(decision.allowed);
        assert!(decision.fallback);
    }

    #[tokio::test]
    async fn test_suspended_user_cannot_submit_images() {
        let ledger = StrikeLedger::new(Arc::new(MemoryStrikeStore::new()));
        let suspensions = SuspensionStateMachine::new(Arc::new(MemorySuspensionStore::new()))
            .with_policy(SuspensionPolicy::new().strike_threshold(1));
        let images = ImageModerationClient::new(
            Arc::new(StubVision {
                result: || {
                    Ok(VisionResponse {
                        allowed: true,
                        categories: vec![],
                        severity: None,
                        reason: None,
                    })
                },
            }),
            FailurePolicy::Open,
        );
        let g = ModerationGateway::new(ledger, suspensions, images);
        let now = Utc::now();

        g.check_text("puta", Surface::Chat, "u1", now).await.unwrap();

        let decision = g
            .check_image(&ImageRef::Bytes(vec![1]), Surface::Post, "u1", now)
            .await
            .unwrap();
        assert!(!decision.allowed);
    }
}
