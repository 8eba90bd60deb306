//! Fault resolution core
//!
//! - `page_cache`: resident-page model deciding major vs minor
//! - `fault_resolver`: address/inode → file region → archive entry
//! - `stats`: per-run counters

pub mod fault_resolver;
pub mod page_cache;
pub mod stats;

pub use fault_resolver::{DropReason, FaultResolver, Resolution, ResolutionContext, ResolvedFault};
pub use page_cache::{PageCacheModel, ResolverConfig, MAX_READAHEAD_PAGES};
pub use stats::{display_statistics, ResolutionStats};
