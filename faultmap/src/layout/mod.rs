//! # Layout Index
//!
//! Lookup structures that turn what a fault event points at into a file:
//!
//! - **`memory_maps`**: address mode, ordered `/proc/<pid>/maps` regions
//!   searched linearly (first containing region wins)
//! - **`inode_table`**: inode mode, exact (device, inode) → path lookup
//!
//! Both are built once per run from the snapshot taken by `collect` and are
//! immutable afterwards.

pub mod inode_table;
pub mod memory_maps;

pub use inode_table::InodeTable;
pub use memory_maps::{parse_map_line, MapEntry, MemoryMap};

use anyhow::Result;
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

use crate::domain::CaptureMode;
use crate::trace_data::{FaultTarget, RawFaultEvent};

/// Snapshot file written by `collect` in address mode
pub const MAPS_FILE: &str = "maps.txt";

/// Snapshot file written by `collect` in inode mode
pub const INODES_FILE: &str = "inodes.txt";

/// The layout snapshot of one capture
#[derive(Debug)]
pub enum LayoutIndex {
    Address(MemoryMap),
    Inode(InodeTable),
}

/// Where a fault landed, before relevance filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLocation<'a> {
    pub path: &'a str,
    pub offset: u64,
}

impl LayoutIndex {
    /// Load the snapshot matching `mode` from a collect output directory.
    ///
    /// # Errors
    /// Returns an error if the snapshot is missing or (for inode tables) malformed
    pub fn load(mode: CaptureMode, output_dir: &Path) -> Result<Self> {
        let (index, entries, is_empty) = match mode {
            CaptureMode::Address => {
                let map = MemoryMap::from_file(&output_dir.join(MAPS_FILE))?;
                let (len, empty) = (map.len(), map.is_empty());
                (LayoutIndex::Address(map), len, empty)
            }
            CaptureMode::Inode => {
                let table = InodeTable::from_file(&output_dir.join(INODES_FILE))?;
                let (len, empty) = (table.len(), table.is_empty());
                (LayoutIndex::Inode(table), len, empty)
            }
        };
        if is_empty {
            warn!("{mode} snapshot has no usable entries, every fault will be a lookup miss");
        } else {
            info!("{mode} snapshot: {entries} entries");
        }
        Ok(index)
    }

    #[must_use]
    pub fn mode(&self) -> CaptureMode {
        match self {
            LayoutIndex::Address(_) => CaptureMode::Address,
            LayoutIndex::Inode(_) => CaptureMode::Inode,
        }
    }

    /// Resolve a fault target to a file and byte offset.
    ///
    /// Returns `None` on a lookup miss, including a target of the other
    /// capture mode.
    #[must_use]
    pub fn locate(&self, target: FaultTarget) -> Option<FileLocation<'_>> {
        match (self, target) {
            (LayoutIndex::Address(map), FaultTarget::Address(addr)) => {
                let entry = map.find(addr)?;
                Some(FileLocation { path: &entry.path, offset: entry.file_offset(addr)? })
            }
            (LayoutIndex::Inode(table), FaultTarget::Inode { key, offset }) => {
                Some(FileLocation { path: table.lookup(key)?, offset })
            }
            _ => None,
        }
    }

    /// Distinct files worth cataloguing, in first-seen order.
    ///
    /// In address mode every mapped file qualifies. An inode table covers
    /// the whole device, so in inode mode only files hit by `events` do.
    #[must_use]
    pub fn candidate_files(&self, events: &[RawFaultEvent]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut push = |path: &str| {
            if seen.insert(path.to_string()) {
                files.push(path.to_string());
            }
        };

        match self {
            LayoutIndex::Address(map) => map.entries().iter().for_each(|e| push(&e.path)),
            LayoutIndex::Inode(_) => {
                events.iter().filter_map(|e| self.locate(e.target)).for_each(|l| push(l.path));
            }
        }

        files
    }
}
