//! Domain model for faultmap
//!
//! Newtypes keep device numbers, inodes and timestamps apart in signatures;
//! the typed errors convert into `anyhow` at the orchestration layer.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{CaptureMode, DeviceId, Inode, InodeKey, Timestamp};

pub use errors::{ArchiveError, CollaboratorError, ParseError, UsageError};
