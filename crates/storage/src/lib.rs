//! Storage access layer for Harbor
//!
//! This crate defines the seam to the object-storage collaborator and the
//! pieces that sit directly on top of it: a TTL-bounded signed-URL cache
//! with single-flight resolution, and generation tokens for discarding
//! stale async results.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod generation;
pub mod object_store;
pub mod signed_url;

pub use generation::{Generation, GenerationCounter};
pub use object_store::{ObjectStore, StorageError, StorageErrorKind, StorageReference, UploadOptions};
pub use signed_url::{SignedUrlCache, SignedUrlConfig};
