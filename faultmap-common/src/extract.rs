//! Consumer-side selection of the faults that hit one file or archive entry.
//!
//! This is the query plots are built from: a page grid sized from the
//! [`FileSizeRecord`] and the ordered faults placed on it.

use log::info;

use crate::records::{FileSizeRecord, MappedFaultRecord};

/// One fault placed on the page grid of the selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFault {
    /// Nanoseconds since the first selected fault
    pub ts: u64,
    pub thread_name: String,
    pub zip_entry_name: Option<String>,
    /// `offset / page_size`
    pub page: u64,
    /// Page distance from the previous selected fault (None for the first)
    pub page_delta: Option<i64>,
    pub is_major: bool,
}

/// Result of [`extract_faults`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSelection {
    pub size: u64,
    /// Header offset of the archive entry, 0 for whole files
    pub file_offset: u64,
    pub faults: Vec<SelectedFault>,
}

/// Select the faults against `file_name` (optionally one `zip_entry_name`).
///
/// Returns `None` when `sizes` has no record for the pair, since the page
/// grid cannot be sized without it.
#[must_use]
pub fn extract_faults(
    file_name: &str,
    zip_entry_name: Option<&str>,
    sizes: &[FileSizeRecord],
    faults: &[MappedFaultRecord],
    include_minor: bool,
    page_size: u64,
) -> Option<FaultSelection> {
    let Some(size_record) = sizes.iter().find(|s| s.matches(file_name, zip_entry_name)) else {
        info!("No file found: {file_name} - {}", zip_entry_name.unwrap_or("<none>"));
        return None;
    };

    let matching: Vec<&MappedFaultRecord> = faults
        .iter()
        .filter(|f| f.file_name == file_name)
        .filter(|f| zip_entry_name.is_none() || f.zip_entry_name.as_deref() == zip_entry_name)
        .filter(|f| include_minor || f.is_major)
        .collect();

    let first_ts = matching.iter().map(|f| f.ts).min().unwrap_or(0);
    let mut previous_page: Option<u64> = None;

    let selected = matching
        .into_iter()
        .map(|f| {
            let page = f.offset / page_size;
            #[allow(clippy::cast_possible_wrap)]
            let page_delta = previous_page.map(|prev| page as i64 - prev as i64);
            previous_page = Some(page);
            SelectedFault {
                ts: f.ts - first_ts,
                thread_name: f.thread_name.clone(),
                zip_entry_name: f.zip_entry_name.clone(),
                page,
                page_delta,
                is_major: f.is_major,
            }
        })
        .collect();

    Some(FaultSelection {
        size: size_record.size,
        file_offset: size_record.file_offset,
        faults: selected,
    })
}
