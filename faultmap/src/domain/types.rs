//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent passing an inode where a device id is
//! expected, which is easy to do with two bare integers side by side.

use std::fmt;
use std::str::FromStr;

/// Device id as reported by `stat %d` and the `s_dev` trace field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev:{}", self.0)
    }
}

/// Inode number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inode(pub u64);

impl fmt::Display for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ino:{}", self.0)
    }
}

/// Key of the inode table: a file is identified by (device, inode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeKey {
    pub dev: DeviceId,
    pub inode: Inode,
}

impl InodeKey {
    #[must_use]
    pub fn new(dev: u64, inode: u64) -> Self {
        Self { dev: DeviceId(dev), inode: Inode(inode) }
    }
}

impl fmt::Display for InodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dev, self.inode)
    }
}

/// Trace timestamp in nanoseconds (trace clock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

/// How faults are captured and therefore how they are resolved.
///
/// x86 emulators expose `page_fault_user` with a virtual address that is
/// resolved against `/proc/<pid>/maps`; ARM devices lack that tracepoint,
/// so page cache insertions (device, inode, page index) are captured and
/// resolved against a device-wide inode table instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Address,
    Inode,
}

impl CaptureMode {
    /// Pick the capture mode from the `ro.product.cpu.abi` property.
    #[must_use]
    pub fn for_abi(abi: &str) -> Self {
        if abi.contains("arm") {
            CaptureMode::Inode
        } else {
            CaptureMode::Address
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Address => write!(f, "address"),
            CaptureMode::Inode => write!(f, "inode"),
        }
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(CaptureMode::Address),
            "inode" => Ok(CaptureMode::Inode),
            other => Err(format!("unknown capture mode '{other}' (expected address or inode)")),
        }
    }
}
