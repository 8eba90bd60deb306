//! External collaborators: the target device, trace capture, trace query
//!
//! - `adb`: [`Device`] implementation over the `adb` command line
//! - `trace_capture`: `record_android_trace`, interruptible with Ctrl+C
//! - `trace_query`: `trace_processor` queries producing the raw fault log
//!
//! All calls are blocking (capture aside) and never retried; callers decide
//! whether a failure is fatal.

pub mod adb;
pub mod trace_capture;
pub mod trace_query;

pub use adb::AdbDevice;
pub use trace_capture::{record_trace, TraceCapture};
pub use trace_query::{fault_query, run_trace_query};

use std::path::Path;

use crate::domain::CollaboratorError;

/// Operations faultmap needs from the target device
pub trait Device {
    /// PID of the running `package` process
    fn pid_of(&self, package: &str) -> Result<u32, CollaboratorError>;

    /// Contents of `/proc/<pid>/maps`
    fn read_maps(&self, pid: u32) -> Result<String, CollaboratorError>;

    /// `<dev> <inode> <path>` lines for every file on the app-relevant partitions
    fn dump_inodes(&self) -> Result<String, CollaboratorError>;

    fn force_stop(&self, package: &str) -> Result<(), CollaboratorError>;

    /// Drop the page cache so the next launch faults from storage
    fn drop_caches(&self) -> Result<(), CollaboratorError>;

    /// Copy a device file to `local`
    fn pull(&self, remote: &str, local: &Path) -> Result<(), CollaboratorError>;

    /// Size in bytes of a device file
    fn file_size(&self, remote: &str) -> Result<u64, CollaboratorError>;

    /// `ro.product.cpu.abi`, e.g. `arm64-v8a` or `x86_64`
    fn abi(&self) -> Result<String, CollaboratorError>;
}
