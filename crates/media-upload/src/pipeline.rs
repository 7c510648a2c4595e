//! Upload orchestration: classification, timeout, and bounded retry
//!
//! Every attempt runs under a hard timeout. Failures are classified from
//! the structured [`StorageErrorKind`] the storage layer produces, never
//! from message text: permission failures are terminal and attempted
//! exactly once, transient failures are retried with increasing backoff,
//! and unclassified failures are treated as non-retryable so an unknown
//! error can never loop forever.

use crate::compress::Compressor;
use std::sync::Arc;
use std::time::Duration;
use storage::{ObjectStore, StorageError, StorageErrorKind, StorageReference, UploadOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How a failed attempt is treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying: network aborts, server errors, timeouts
    Transient,
    /// Auth/ACL rejection; retrying cannot succeed
    Permission,
    /// Unclassified; not retried to avoid infinite loops
    Unknown,
}

impl FailureClass {
    /// Classify a storage error by its structured kind
    pub fn from_kind(kind: StorageErrorKind) -> Self {
        match kind {
            StorageErrorKind::Network | StorageErrorKind::Server | StorageErrorKind::Timeout => {
                FailureClass::Transient
            }
            StorageErrorKind::Permission => FailureClass::Permission,
            StorageErrorKind::Other => FailureClass::Unknown,
        }
    }
}

/// Errors surfaced by the upload pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    /// Storage rejected the credentials or ACL; surfaced verbatim
    #[error("Upload not permitted: {0}")]
    PermissionDenied(String),

    /// All attempts failed with transient errors
    #[error("Upload failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        last: StorageError,
    },

    /// An unclassified failure; not retried
    #[error("Upload failed: {0}")]
    Unclassified(StorageError),
}

/// Retry policy for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Backoff schedule; the last entry repeats if attempts outnumber it
    pub backoff: Vec<Duration>,
    /// Hard bound on a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ],
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt bound
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the backoff schedule
    pub fn backoff(mut self, schedule: Vec<Duration>) -> Self {
        self.backoff = schedule;
        self
    }

    /// Set the per-attempt timeout
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay before retrying after the given (1-based) failed attempt
    fn delay_after(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).saturating_sub(1);
        self.backoff
            .get(index)
            .or(self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Where an upload lands
#[derive(Debug, Clone)]
pub struct UploadDestination {
    /// Target bucket
    pub bucket: String,
    /// Target path within the bucket
    pub path: String,
    /// MIME type recorded on the object
    pub content_type: Option<String>,
    /// Whether the bucket is publicly readable
    pub public: bool,
}

impl UploadDestination {
    /// Destination in a private bucket
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
            content_type: None,
            public: false,
        }
    }

    /// Set the content type
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Mark the destination bucket as public
    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    fn reference(&self) -> StorageReference {
        if self.public {
            StorageReference::public(&self.bucket, &self.path)
        } else {
            StorageReference::private(&self.bucket, &self.path)
        }
    }
}

/// One attempt within an upload operation; lives only as long as the
/// operation itself
#[derive(Debug, Clone)]
struct UploadAttempt {
    attempt_number: u32,
    classification: FailureClass,
}

/// Orchestrates compression, timeout, classification, and retry
pub struct UploadPipeline {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
    compressor: Option<Compressor>,
}

impl UploadPipeline {
    /// Create a pipeline with the default retry policy and no compression
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, retry: RetryPolicy::default(), compressor: None }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable pre-upload compression
    pub fn with_compression(mut self, compressor: Compressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Upload bytes to the destination, returning a reference on success
    ///
    /// The returned error is the terminal outcome: permission failures
    /// verbatim after a single attempt, the last transient error after
    /// retry exhaustion.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        destination: &UploadDestination,
    ) -> Result<StorageReference, UploadError> {
        let payload = match &self.compressor {
            Some(compressor) => compressor.compress_if_needed(&bytes),
            None => bytes,
        };

        let mut options = UploadOptions::new().upsert(true);
        if let Some(mime) = &destination.content_type {
            options = options.content_type(mime.clone());
        }

        let mut attempts: Vec<UploadAttempt> = Vec::new();

        for attempt in 1..=self.retry.max_attempts {
            match self.attempt(&payload, destination, &options).await {
                Ok(()) => {
                    info!(
                        bucket = %destination.bucket,
                        path = %destination.path,
                        attempt,
                        "upload complete"
                    );
                    return Ok(destination.reference());
                }
                Err(err) => {
                    let class = FailureClass::from_kind(err.kind);
                    attempts.push(UploadAttempt { attempt_number: attempt, classification: class });
                    debug!(attempt, class = ?class, error = %err, "upload attempt failed");

                    match class {
                        FailureClass::Permission => {
                            return Err(UploadError::PermissionDenied(err.message));
                        }
                        FailureClass::Unknown => {
                            return Err(UploadError::Unclassified(err));
                        }
                        FailureClass::Transient => {
                            if attempt == self.retry.max_attempts {
                                let final_attempt = attempts
                                    .last()
                                    .map(|a| (a.attempt_number, a.classification));
                                warn!(
                                    attempts = attempts.len(),
                                    final_attempt = ?final_attempt,
                                    "upload exhausted retry budget"
                                );
                                return Err(UploadError::Exhausted {
                                    attempts: attempt,
                                    last: err,
                                });
                            }
                            tokio::time::sleep(self.retry.delay_after(attempt)).await;
                        }
                    }
                }
            }
        }

        // Only reachable with a zero-attempt policy
        Err(UploadError::Unclassified(StorageError::new(
            StorageErrorKind::Other,
            "retry policy allows no attempts",
        )))
    }

    /// One transfer attempt under the hard timeout
    async fn attempt(
        &self,
        payload: &[u8],
        destination: &UploadDestination,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        let transfer = self
            .store
            .put(&destination.bucket, &destination.path, payload, options);

        match tokio::time::timeout(self.retry.attempt_timeout, transfer).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::timeout(self.retry.attempt_timeout)),
        }
    }
}
