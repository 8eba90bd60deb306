//! # Persisted Tabular Contract (Processor ↔ Consumers)
//!
//! Defines the records written by `faultmap process` and read back by
//! downstream consumers (plotting notebooks, ad-hoc scripts, regression
//! checks). The column layout is the durable contract of the tool, so both
//! sides share these types rather than re-declaring headers.
//!
//! ## Files
//!
//! | File                | Record              | Columns                                                                  |
//! |---------------------|---------------------|--------------------------------------------------------------------------|
//! | `mapped_faults.csv` | [`MappedFaultRecord`] | `ts, process_name, thread_name, file_name, zip_entry_name, offset, is_major` |
//! | `file_sizes.csv`    | [`FileSizeRecord`]    | `file_name, zip_entry_name, size, file_offset`                            |
//!
//! An empty `zip_entry_name` means "no sub-entry". `is_major` is written as
//! the literals `True` / `False`.
//!
//! ## Key Types
//!
//! - [`TableWriter`] - streaming CSV sink with a header row
//! - [`load_mappings`] - read both files back from an output directory
//! - [`extract_faults`] - select the faults of one file (or archive entry)

pub mod extract;
pub mod records;
pub mod table;

pub use extract::{extract_faults, FaultSelection, SelectedFault};
pub use records::{FileSizeRecord, MappedFaultRecord};
pub use table::{load_mappings, read_records, TableError, TableWriter};

// ============================================================================
// Page Model Constants
// ============================================================================

/// Page size assumed when aligning fault offsets.
///
/// Android devices are moving to 16 KB pages; callers pass the page size
/// explicitly and this is only the default.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Pages the kernel is assumed to read ahead after a major fault (128 KB at
/// 4 KB pages).
pub const DEFAULT_READAHEAD_PAGES: u64 = 32;

// ============================================================================
// Output File Names
// ============================================================================

/// Resolved fault stream
pub const MAPPED_FAULTS_FILE: &str = "mapped_faults.csv";

/// File and archive entry sizes
pub const FILE_SIZES_FILE: &str = "file_sizes.csv";
