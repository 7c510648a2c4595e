//! Object storage collaborator seam
//!
//! Harbor never talks to a concrete storage backend directly; it goes
//! through the [`ObjectStore`] trait. Errors carry a structured
//! [`StorageErrorKind`] so callers classify failures without inspecting
//! message text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Structured classification of a storage failure
///
/// Produced by the I/O layer, consumed by the upload retry policy. This is
/// the contract that replaces substring matching on error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageErrorKind {
    /// Authentication or ACL rejection; never worth retrying
    Permission,
    /// Connection aborted, reset, or unreachable
    Network,
    /// Server-side failure (zero or 5xx status)
    Server,
    /// The operation exceeded its time bound
    Timeout,
    /// Anything the I/O layer could not classify
    Other,
}

/// An error from the object storage collaborator
#[derive(Debug, Clone, Error)]
#[error("storage error ({kind:?}): {message}")]
pub struct StorageError {
    /// Structured failure class
    pub kind: StorageErrorKind,
    /// Backend-provided detail, surfaced verbatim for permission errors
    pub message: String,
}

impl StorageError {
    /// Create an error with an explicit kind
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Permission / ACL failure
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Permission, message)
    }

    /// Network-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Network, message)
    }

    /// Server-side failure with an HTTP-ish status
    pub fn server(status: u16) -> Self {
        Self::new(StorageErrorKind::Server, format!("server returned status {status}"))
    }

    /// Timeout failure
    pub fn timeout(bound: Duration) -> Self {
        Self::new(StorageErrorKind::Timeout, format!("operation exceeded {bound:?}"))
    }
}

/// Options for an object upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// MIME type recorded on the stored object
    pub content_type: Option<String>,
    /// Overwrite an existing object at the same path
    pub upsert: bool,
}

impl UploadOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Allow overwriting an existing object
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// Reference to stored or external content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageReference {
    /// Already a full URL; needs no signing
    External(String),
    /// An object in a storage bucket
    Object {
        /// Bucket name
        bucket: String,
        /// Path within the bucket
        path: String,
        /// Whether the bucket is publicly readable
        public: bool,
    },
}

impl StorageReference {
    /// Reference to an object in a private bucket
    pub fn private(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Object { bucket: bucket.into(), path: path.into(), public: false }
    }

    /// Reference to an object in a public bucket
    pub fn public(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Object { bucket: bucket.into(), path: path.into(), public: true }
    }

    /// Parse a reference string; full URLs are external, everything else is
    /// treated as `bucket/path` in a private bucket
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Self::External(reference.to_string());
        }
        match reference.split_once('/') {
            Some((bucket, path)) => Self::private(bucket, path),
            None => Self::private(reference, ""),
        }
    }

    /// Stable cache key for this reference
    pub fn key(&self) -> String {
        match self {
            Self::External(url) => url.clone(),
            Self::Object { bucket, path, .. } => format!("{bucket}/{path}"),
        }
    }

    /// Whether resolving this reference requires a signing call
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::Object { public: false, .. })
    }
}

/// Asynchronous interface to the object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes to `bucket/path`
    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> Result<(), StorageError>;

    /// Create a temporary authenticated URL valid for `ttl`
    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    /// Permanent URL for an object in a public bucket
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
