//! Content moderation for Harbor
//!
//! This crate decides whether user-generated content may be published:
//! synchronous text checks backed by the `text-filter` rule engine,
//! delegated image checks through an external vision service, and the
//! strike/suspension accounting that escalates repeated violations into a
//! temporary write-block.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decision;
pub mod gateway;
pub mod strikes;
pub mod suspension;
pub mod vision;

pub use decision::{ModerationDecision, Surface};
pub use gateway::{GatewayError, ModerationGateway, TextVerdict};
pub use strikes::{MemoryStrikeStore, StoreError, StrikeLedger, StrikeRecord, StrikeStore};
pub use suspension::{
    MemorySuspensionStore, SuspensionPolicy, SuspensionStateMachine, SuspensionStatus,
    SuspensionStore, SuspensionWindow,
};
pub use vision::{
    FailurePolicy, HttpVisionTransport, ImageModerationClient, ImageRef, VisionConfig,
    VisionError, VisionTransport,
};
