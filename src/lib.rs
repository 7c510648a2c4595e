//! Harbor — trust and safety layer for a youth social platform
//!
//! Harbor decides, for every piece of user-generated text and media,
//! whether it may be published, and moves media bytes to object storage
//! reliably under flaky networks. This facade re-exports the subsystem
//! crates; the application wires them together with its own storage and
//! vision-service collaborators.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use media_upload;
pub use moderation;
pub use storage;
pub use text_filter;
