//! Process memory map parsing for address-mode resolution
//!
//! A `/proc/<pid>/maps` snapshot is turned into an ordered list of
//! file-backed regions. Addresses captured by `page_fault_user` are then
//! translated into file offsets:
//!
//! ```text
//! file_offset = address - region.begin + region.offset
//! ```

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::domain::ParseError;

/// Marker the kernel appends to mappings whose file was unlinked
const DELETED_MARKER: &str = " (deleted)";

/// One file-backed region of a process's address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub begin: u64,
    /// Inclusive
    pub end: u64,
    pub path: String,
    /// File offset mapped at `begin`
    pub offset: u64,
}

impl MapEntry {
    /// Check if an address falls within this region (both ends inclusive)
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        self.begin <= addr && addr <= self.end
    }

    /// Translate an address into an offset within `path`.
    ///
    /// `None` if the address lies below `begin` or the offset overflows.
    #[must_use]
    pub fn file_offset(&self, addr: u64) -> Option<u64> {
        addr.checked_sub(self.begin)?.checked_add(self.offset)
    }
}

/// File-backed regions in snapshot order
#[derive(Debug, Default)]
pub struct MemoryMap {
    entries: Vec<MapEntry>,
}

impl MemoryMap {
    /// Read and parse a maps snapshot from disk.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be read
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read memory map snapshot {}", path.display()))?;
        Ok(Self::parse(&text, &path.display().to_string()))
    }

    /// Parse a maps snapshot.
    ///
    /// Malformed lines are logged and skipped: snapshots mix line shapes
    /// (bracketed anonymous descriptors, vsyscall pages) and one odd line
    /// must not discard the rest.
    #[must_use]
    pub fn parse(text: &str, source_name: &str) -> Self {
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in text.lines().enumerate() {
            match parse_map_line(line, source_name, idx + 1) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping map line: {e}");
                    skipped += 1;
                }
            }
        }

        debug!("{source_name}: {} file-backed regions, {skipped} malformed lines", entries.len());
        Self { entries }
    }

    #[must_use]
    pub fn from_entries(entries: Vec<MapEntry>) -> Self {
        Self { entries }
    }

    /// First region, in snapshot order, containing `addr`.
    ///
    /// Overlapping regions are not disambiguated: the earliest one wins.
    #[must_use]
    pub fn find(&self, addr: u64) -> Option<&MapEntry> {
        self.entries.iter().find(|entry| entry.contains(addr))
    }

    #[must_use]
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one maps line: `begin-end perms offset dev inode [path]`.
///
/// Returns `Ok(None)` for lines that are well-formed but not file-backed
/// (inode 0, deleted files, no path).
///
/// # Errors
/// Returns a [`ParseError`] if the line has fewer than five fields or its
/// range, offset or inode fields are not numbers
pub fn parse_map_line(
    line: &str,
    source_name: &str,
    line_no: usize,
) -> Result<Option<MapEntry>, ParseError> {
    let err = |reason: String| ParseError::new(source_name, line_no, reason);

    let mut rest = line.trim();
    if rest.is_empty() {
        return Ok(None);
    }

    let mut fields = [""; 5];
    for field in &mut fields {
        let (head, tail) = split_field(rest);
        if head.is_empty() {
            return Err(err(format!("expected at least 5 fields in '{line}'")));
        }
        *field = head;
        rest = tail;
    }
    let [range, _perms, offset, _dev, inode] = fields;
    let path = rest;

    let inode: u64 = inode.parse().map_err(|_| err(format!("invalid inode '{inode}'")))?;
    if inode == 0 || line.contains(DELETED_MARKER) || path.is_empty() {
        return Ok(None);
    }

    let (begin, end) =
        range.split_once('-').ok_or_else(|| err(format!("invalid address range '{range}'")))?;
    let parse_hex = |value: &str, what: &str| {
        u64::from_str_radix(value, 16).map_err(|_| err(format!("invalid hex {what} '{value}'")))
    };

    let begin = parse_hex(begin, "range start")?;
    let end = parse_hex(end, "range end")?;
    let offset = parse_hex(offset, "offset")?;
    if begin > end {
        return Err(err(format!("inverted address range '{range}'")));
    }
    if offset.checked_add(end - begin).is_none() {
        return Err(err(format!("offset {offset:#x} overflows over range '{range}'")));
    }

    Ok(Some(MapEntry { begin, end, path: path.to_string(), offset }))
}

/// Split off the first whitespace-delimited field, returning the trimmed remainder
fn split_field(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}
