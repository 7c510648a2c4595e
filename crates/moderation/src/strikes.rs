//! Per-user rolling violation ledger
//!
//! Strikes are append-only within a trailing window; records outside the
//! window stop counting without needing immediate deletion. The ledger
//! talks to a [`StrikeStore`] so production can back it with a
//! transactionally consistent table — concurrent violations for the same
//! user must serialize in the store, never in process memory. The bundled
//! [`MemoryStrikeStore`] appends under a single lock and is meant for
//! tests and single-process deployments.

use crate::decision::Surface;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Error from a strike or suspension store backend
#[derive(Debug, Clone, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// One recorded policy violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeRecord {
    /// User the strike is attributed to
    pub user_id: String,
    /// When the violation happened
    pub timestamp: DateTime<Utc>,
    /// Where the violating content was submitted
    pub surface: Surface,
}

/// Append-only violation log, keyed by user
#[async_trait]
pub trait StrikeStore: Send + Sync {
    /// Append a strike; appends for the same user must serialize so two
    /// simultaneous violations are both counted
    async fn append(&self, record: StrikeRecord) -> Result<(), StoreError>;

    /// Count a user's strikes at or after `cutoff`
    async fn count_since(&self, user_id: &str, cutoff: DateTime<Utc>) -> Result<u32, StoreError>;

    /// Delete records older than `cutoff`; returns how many were removed
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-memory strike store
#[derive(Default)]
pub struct MemoryStrikeStore {
    records: Mutex<HashMap<String, Vec<StrikeRecord>>>,
}

impl MemoryStrikeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StrikeStore for MemoryStrikeStore {
    async fn append(&self, record: StrikeRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.entry(record.user_id.clone()).or_default().push(record);
        Ok(())
    }

    async fn count_since(&self, user_id: &str, cutoff: DateTime<Utc>) -> Result<u32, StoreError> {
        let records = self.records.lock().await;
        let count = records
            .get(user_id)
            .map(|list| list.iter().filter(|r| r.timestamp >= cutoff).count())
            .unwrap_or(0);
        Ok(count as u32)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.lock().await;
        let mut removed = 0u64;
        for list in records.values_mut() {
            let before = list.len();
            list.retain(|r| r.timestamp >= cutoff);
            removed += (before - list.len()) as u64;
        }
        records.retain(|_, list| !list.is_empty());
        Ok(removed)
    }
}

/// Rolling violation counter over a [`StrikeStore`]
pub struct StrikeLedger {
    store: Arc<dyn StrikeStore>,
    window: Duration,
}

impl StrikeLedger {
    /// Default rolling window for strike counting
    pub const DEFAULT_WINDOW_HOURS: i64 = 24;

    /// Create a ledger with the default 24h window
    pub fn new(store: Arc<dyn StrikeStore>) -> Self {
        Self { store, window: Duration::hours(Self::DEFAULT_WINDOW_HOURS) }
    }

    /// Override the rolling window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Record a strike and return the post-increment count within the
    /// window, so the caller can warn the user before suspension triggers
    pub async fn record_strike(
        &self,
        user_id: &str,
        surface: Surface,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        self.store
            .append(StrikeRecord {
                user_id: user_id.to_string(),
                timestamp: now,
                surface,
            })
            .await?;
        let count = self.count_recent(user_id, now).await?;
        debug!(user = %user_id, surface = surface.as_str(), count, "strike recorded");
        Ok(count)
    }

    /// Count strikes within the trailing window from `now`
    pub async fn count_recent(&self, user_id: &str, now: DateTime<Utc>) -> Result<u32, StoreError> {
        self.store.count_since(user_id, now - self.window).await
    }

    /// Lazily drop records that can no longer affect any count
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.store.prune_before(now - self.window).await
    }
}
