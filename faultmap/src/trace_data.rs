//! Raw fault log parsing
//!
//! The trace query engine emits one CSV row per captured event. Two row
//! shapes exist, depending on the capture mode:
//!
//! ```text
//! address mode: ts, process_name, thread_name, address, ip
//! inode mode:   ts, process_name, thread_name, sdev, inode, index
//! ```
//!
//! Any unparsable row aborts the run: fault counts are used for diagnosis
//! and a silently shortened log would skew them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::domain::{CaptureMode, InodeKey, ParseError, Timestamp};

/// What a raw fault points at, before resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    /// Faulting virtual address in the process
    Address(u64),
    /// Byte offset (page index × page size) within the file `key`
    Inode { key: InodeKey, offset: u64 },
}

impl fmt::Display for FaultTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultTarget::Address(addr) => write!(f, "address {addr:#x}"),
            FaultTarget::Inode { key, offset } => write!(f, "inode {key} offset {offset:#x}"),
        }
    }
}

/// One captured fault, in log order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFaultEvent {
    pub ts: Timestamp,
    pub process_name: String,
    pub thread_name: String,
    pub target: FaultTarget,
}

#[derive(Deserialize)]
struct AddressRow {
    ts: u64,
    process_name: String,
    thread_name: String,
    address: u64,
}

#[derive(Deserialize)]
struct InodeRow {
    ts: u64,
    process_name: String,
    thread_name: String,
    sdev: u64,
    inode: u64,
    #[serde(alias = "offset")]
    index: u64,
}

/// Read the fault log written by the trace query.
///
/// # Errors
/// Returns an error if the file cannot be read or any row is malformed
pub fn load_fault_log(
    path: &Path,
    mode: CaptureMode,
    page_size: u64,
) -> Result<Vec<RawFaultEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fault log {}", path.display()))?;
    Ok(parse_fault_log(&text, mode, page_size, &path.display().to_string())?)
}

/// Parse a fault log. Blank lines before the header row are tolerated.
///
/// # Errors
/// Returns a [`ParseError`] for the first row that does not deserialize
pub fn parse_fault_log(
    text: &str,
    mode: CaptureMode,
    page_size: u64,
    source_name: &str,
) -> Result<Vec<RawFaultEvent>, ParseError> {
    let body = text.trim_start();
    let skipped_lines = text[..text.len() - body.len()].matches('\n').count();

    let row_error = |err: &csv::Error| {
        let line = err.position().map_or(0, |p| p.line()) + skipped_lines as u64;
        ParseError::new(source_name, usize::try_from(line).unwrap_or(usize::MAX), err.to_string())
    };

    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut events = Vec::new();

    match mode {
        CaptureMode::Address => {
            for row in reader.deserialize::<AddressRow>() {
                let row = row.map_err(|e| row_error(&e))?;
                events.push(RawFaultEvent {
                    ts: Timestamp(row.ts),
                    process_name: row.process_name,
                    thread_name: row.thread_name,
                    target: FaultTarget::Address(row.address),
                });
            }
        }
        CaptureMode::Inode => {
            for (idx, row) in reader.deserialize::<InodeRow>().enumerate() {
                let row = row.map_err(|e| row_error(&e))?;
                let offset = row.index.checked_mul(page_size).ok_or_else(|| {
                    ParseError::new(
                        source_name,
                        skipped_lines + idx + 2,
                        format!("page index {} overflows a byte offset", row.index),
                    )
                })?;
                events.push(RawFaultEvent {
                    ts: Timestamp(row.ts),
                    process_name: row.process_name,
                    thread_name: row.thread_name,
                    target: FaultTarget::Inode { key: InodeKey::new(row.sdev, row.inode), offset },
                });
            }
        }
    }

    Ok(events)
}
