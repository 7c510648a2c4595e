//! TTL-bounded signed URL cache with single-flight resolution
//!
//! Converts opaque storage references into temporary authenticated URLs.
//! Cached entries expire ahead of the real grant (safety margin) so a hit
//! is never served past true validity, and concurrent resolutions for the
//! same reference collapse into one signing call.
//!
//! The cache is an explicitly constructed, injectable component: callers
//! that want process-wide sharing hold it in an `Arc` themselves. There is
//! no hidden singleton, so tests can instantiate isolated caches.

use crate::object_store::{ObjectStore, StorageReference};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Configuration for signed URL resolution
#[derive(Debug, Clone)]
pub struct SignedUrlConfig {
    /// TTL requested from the storage backend
    pub grant_ttl: Duration,
    /// How much earlier than the real grant a cached entry expires
    pub safety_margin: Duration,
    /// Hard bound on a single signing call
    pub sign_timeout: Duration,
}

impl Default for SignedUrlConfig {
    fn default() -> Self {
        Self {
            grant_ttl: Duration::from_secs(3600),
            safety_margin: Duration::from_secs(60),
            sign_timeout: Duration::from_secs(10),
        }
    }
}

impl SignedUrlConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grant TTL requested from storage
    pub fn grant_ttl(mut self, ttl: Duration) -> Self {
        self.grant_ttl = ttl;
        self
    }

    /// Set the cache-expiry safety margin
    pub fn safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the per-call signing timeout
    pub fn sign_timeout(mut self, timeout: Duration) -> Self {
        self.sign_timeout = timeout;
        self
    }

    /// Cache lifetime of a fresh entry: grant TTL minus the safety margin
    fn cache_ttl(&self) -> Duration {
        self.grant_ttl.checked_sub(self.safety_margin).unwrap_or(self.grant_ttl)
    }
}

/// A cached temporary URL
#[derive(Debug, Clone)]
struct CachedSignedUrl {
    url: String,
    expires_at: Instant,
}

impl CachedSignedUrl {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache mapping storage references to temporary authenticated URLs
pub struct SignedUrlCache {
    store: Arc<dyn ObjectStore>,
    config: SignedUrlConfig,
    entries: Mutex<HashMap<String, CachedSignedUrl>>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl SignedUrlCache {
    /// Create a cache over a storage backend
    pub fn new(store: Arc<dyn ObjectStore>, config: SignedUrlConfig) -> Self {
        Self {
            store,
            config,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a reference to a URL suitable for display
    ///
    /// External and public references pass through without signing. Private
    /// references are served from cache while live; otherwise exactly one
    /// signing call is issued per reference no matter how many callers are
    /// waiting. On signing failure the raw reference is returned as a
    /// degraded fallback rather than failing the caller.
    pub async fn resolve(&self, reference: &StorageReference) -> String {
        let (bucket, path) = match reference {
            StorageReference::External(url) => return url.clone(),
            StorageReference::Object { bucket, path, public: true } => {
                return self.store.public_url(bucket, path);
            }
            StorageReference::Object { bucket, path, public: false } => (bucket, path),
        };

        let key = reference.key();

        if let Some(url) = self.cached(&key) {
            return url;
        }

        let cell = self.inflight_cell(&key);

        let result = cell
            .get_or_try_init(|| self.sign_and_store(&key, bucket, path))
            .await
            .cloned();

        self.clear_inflight(&key, &cell);

        match result {
            Ok(url) => url,
            Err(err) => {
                warn!(reference = %key, error = %err, "signing failed, returning raw reference");
                key
            }
        }
    }

    /// Look up a live cache entry, evicting it lazily if expired
    fn cached(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();

        if let Some(entry) = entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.url.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Get or create the single-flight cell for a reference
    fn inflight_cell(&self, key: &str) -> Arc<OnceCell<String>> {
        let mut inflight = self.inflight.lock().unwrap();
        inflight.entry(key.to_string()).or_default().clone()
    }

    /// Drop the inflight cell once resolution settled, so a later expiry
    /// starts a fresh flight
    fn clear_inflight(&self, key: &str, cell: &Arc<OnceCell<String>>) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(current) = inflight.get(key) {
            if Arc::ptr_eq(current, cell) {
                inflight.remove(key);
            }
        }
    }

    async fn sign_and_store(
        &self,
        key: &str,
        bucket: &str,
        path: &str,
    ) -> Result<String, crate::object_store::StorageError> {
        let signing = self.store.create_signed_url(bucket, path, self.config.grant_ttl);
        let url = match tokio::time::timeout(self.config.sign_timeout, signing).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(crate::object_store::StorageError::timeout(self.config.sign_timeout))
            }
        };

        let entry = CachedSignedUrl {
            url: url.clone(),
            expires_at: Instant::now() + self.config.cache_ttl(),
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        debug!(reference = %key, "signed url cached");

        Ok(url)
    }

    /// Number of live and expired entries currently held
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Drop all cached URLs
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
