//! Resilient media upload pipeline for Harbor
//!
//! Moves media bytes to object storage without losing or duplicating data
//! under flaky networks: optional client-side compression, hard per-attempt
//! timeouts, structured failure classification, and bounded retries with
//! increasing backoff.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compress;
pub mod pipeline;

pub use compress::{CompressionConfig, Compressor};
pub use pipeline::{
    FailureClass, RetryPolicy, UploadDestination, UploadError, UploadPipeline,
};
