//! Suspension state machine
//!
//! Two states per user: Active and Suspended(until). Crossing the strike
//! threshold within the rolling window creates a suspension window; the
//! transition back to Active is implicit — any check at or past `until`
//! reads as Active, and the stored window is cleared lazily. Suspension
//! blocks write actions only, never reads.

use crate::strikes::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A stored suspension; absence means the user is Active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspensionWindow {
    /// Suspended user
    pub user_id: String,
    /// When write access returns
    pub until: DateTime<Utc>,
    /// Strike count that triggered the suspension
    pub strike_count_at_trigger: u32,
}

/// Persistence seam for suspension windows
#[async_trait]
pub trait SuspensionStore: Send + Sync {
    /// Fetch the stored window for a user, if any
    async fn get(&self, user_id: &str) -> Result<Option<SuspensionWindow>, StoreError>;

    /// Store or replace a user's window
    async fn set(&self, window: SuspensionWindow) -> Result<(), StoreError>;

    /// Remove a user's window
    async fn clear(&self, user_id: &str) -> Result<(), StoreError>;
}

/// In-memory suspension store for tests and single-process deployments
#[derive(Default)]
pub struct MemorySuspensionStore {
    windows: Mutex<HashMap<String, SuspensionWindow>>,
}

impl MemorySuspensionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SuspensionStore for MemorySuspensionStore {
    async fn get(&self, user_id: &str) -> Result<Option<SuspensionWindow>, StoreError> {
        Ok(self.windows.lock().await.get(user_id).cloned())
    }

    async fn set(&self, window: SuspensionWindow) -> Result<(), StoreError> {
        self.windows.lock().await.insert(window.user_id.clone(), window);
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), StoreError> {
        self.windows.lock().await.remove(user_id);
        Ok(())
    }
}

/// When and for how long suspensions trigger
#[derive(Debug, Clone)]
pub struct SuspensionPolicy {
    /// Strikes within the rolling window that trigger a suspension
    pub strike_threshold: u32,
    /// How long a suspension lasts
    pub duration: Duration,
}

impl Default for SuspensionPolicy {
    fn default() -> Self {
        Self {
            strike_threshold: 3,
            duration: Duration::hours(1),
        }
    }
}

impl SuspensionPolicy {
    /// Create the default policy (3 strikes, 1 hour)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strike threshold
    pub fn strike_threshold(mut self, threshold: u32) -> Self {
        self.strike_threshold = threshold.max(1);
        self
    }

    /// Set the suspension duration
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Result of a suspension check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionStatus {
    /// Whether the user is currently write-blocked
    pub suspended: bool,
    /// When the block lifts, if suspended
    pub until: Option<DateTime<Utc>>,
}

impl SuspensionStatus {
    /// An active (not suspended) status
    pub fn active() -> Self {
        Self { suspended: false, until: None }
    }

    /// Time left on the block, zero if not suspended
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.until {
            Some(until) if self.suspended && until > now => until - now,
            _ => Duration::zero(),
        }
    }
}

/// Derives write-access state from the strike ledger
pub struct SuspensionStateMachine {
    store: Arc<dyn SuspensionStore>,
    policy: SuspensionPolicy,
}

impl SuspensionStateMachine {
    /// Create a state machine with the default policy
    pub fn new(store: Arc<dyn SuspensionStore>) -> Self {
        Self { store, policy: SuspensionPolicy::default() }
    }

    /// Replace the policy
    pub fn with_policy(mut self, policy: SuspensionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check a user's write-access state
    ///
    /// An expired window reads as Active without an explicit stored
    /// transition; the stale row is cleared lazily on the way out.
    pub async fn is_suspended(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SuspensionStatus, StoreError> {
        match self.store.get(user_id).await? {
            Some(window) if now < window.until => Ok(SuspensionStatus {
                suspended: true,
                until: Some(window.until),
            }),
            Some(_) => {
                self.store.clear(user_id).await?;
                Ok(SuspensionStatus::active())
            }
            None => Ok(SuspensionStatus::active()),
        }
    }

    /// Feed a post-increment strike count through the threshold
    ///
    /// Returns the new `until` timestamp when this count triggers a
    /// suspension.
    pub async fn apply_strike_count(
        &self,
        user_id: &str,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        if count < self.policy.strike_threshold {
            return Ok(None);
        }

        let until = now + self.policy.duration;
        self.store
            .set(SuspensionWindow {
                user_id: user_id.to_string(),
                until,
                strike_count_at_trigger: count,
            })
            .await?;
        info!(user = %user_id, %until, count, "user suspended");
        Ok(Some(until))
    }

    /// The policy in effect
    pub fn policy(&self) -> &SuspensionPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> SuspensionStateMachine {
        SuspensionStateMachine::new(Arc::new(MemorySuspensionStore::new()))
    }

    #[tokio::test]
    async fn test_unknown_user_is_active() {
        let m = machine();
        let status = m.is_suspended("u1", Utc::now()).await.unwrap();
        assert!(!status.suspended);
        assert!(status.until.is_none());
    }

    #[tokio::test]
    async fn test_below_threshold_does_not_suspend() {
        let m = machine();
        let now = Utc::now();

        assert!(m.apply_strike_count("u1", 1, now).await.unwrap().is_none());
        assert!(m.apply_strike_count("u1", 2, now).await.unwrap().is_none());
        assert!(!m.is_suspended("u1", now).await.unwrap().suspended);
    }

    #[tokio::test]
    async fn test_threshold_triggers_suspension() {
        let m = machine();
        let now = Utc::now();

        let until = m.apply_strike_count("u1", 3, now).await.unwrap().unwrap();
        assert_eq!(until, now + Duration::hours(1));

        let status = m.is_suspended("u1", now).await.unwrap();
        assert!(status.suspended);
        assert_eq!(status.until, Some(until));
        assert_eq!(status.remaining(now), Duration::hours(1));
    }

    #[tokio::test]
    async fn test_expiry_is_implicit() {
        let m = machine();
        let now = Utc::now();

        m.apply_strike_count("u1", 3, now).await.unwrap();

        // One second past the window the user reads as active
        let later = now + Duration::hours(1) + Duration::seconds(1);
        let status = m.is_suspended("u1", later).await.unwrap();
        assert!(!status.suspended);
        assert_eq!(status.remaining(later), Duration::zero());
    }

    #[tokio::test]
    async fn test_expired_window_cleared_lazily() {
        let store = Arc::new(MemorySuspensionStore::new());
        let m = SuspensionStateMachine::new(store.clone());
        let now = Utc::now();

        m.apply_strike_count("u1", 3, now).await.unwrap();
        assert!(store.get("u1").await.unwrap().is_some());

        let later = now + Duration::hours(2);
        m.is_suspended("u1", later).await.unwrap();
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let policy = SuspensionPolicy::new()
            .strike_threshold(2)
            .duration(Duration::minutes(30));
        let m = machine().with_policy(policy);
        let now = Utc::now();

        let until = m.apply_strike_count("u1", 2, now).await.unwrap().unwrap();
        assert_eq!(until, now + Duration::minutes(30));
    }
}
