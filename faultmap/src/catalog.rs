//! # Artifact Size Catalog
//!
//! Sizes of every archive entry and every package-code file, written to
//! `file_sizes.csv` so consumers can lay faults out on a page grid.
//!
//! ```text
//! staged APK      → one record per entry (name, compressed size, header offset)
//! other relevant  → one record per file (no entry, size from the device, offset 0)
//! ```

use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

use faultmap_common::{FileSizeRecord, TableError, TableWriter};

use crate::archive::StagedArchives;
use crate::classification::is_maybe_package_code;
use crate::device::Device;

/// Build the size records for `files` and the staged archives.
///
/// Each whole file's size is queried at most once. A failed query is
/// logged and the file is left out.
pub fn build_file_sizes(
    device: &dyn Device,
    files: &[String],
    archives: &StagedArchives,
) -> Vec<FileSizeRecord> {
    info!("Computing file sizes...");

    let mut records: Vec<FileSizeRecord> = archives
        .iter()
        .flat_map(|archive| {
            archive.table.entries().iter().map(|entry| FileSizeRecord {
                file_name: archive.remote_path.clone(),
                zip_entry_name: Some(entry.name.clone()),
                size: entry.size,
                file_offset: entry.offset,
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for file in files {
        if archives.contains(file) || !is_maybe_package_code(file) || !seen.insert(file.as_str()) {
            continue;
        }
        match device.file_size(file) {
            Ok(size) => records.push(FileSizeRecord::whole_file(file.clone(), size)),
            Err(e) => warn!("No size for {file}: {e}"),
        }
    }

    records
}

/// Write `records` to `path` with a header row.
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_file_sizes(path: &Path, records: &[FileSizeRecord]) -> Result<(), TableError> {
    let mut writer = TableWriter::create::<FileSizeRecord>(path)?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, ArchiveEntryTable, StagedArchive};
    use crate::domain::CollaboratorError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Answers size queries from a fixed table and records every query
    struct SizeOnlyDevice {
        sizes: HashMap<&'static str, u64>,
        queries: RefCell<Vec<String>>,
    }

    impl Device for SizeOnlyDevice {
        fn pid_of(&self, _: &str) -> Result<u32, CollaboratorError> {
            unimplemented!()
        }
        fn read_maps(&self, _: u32) -> Result<String, CollaboratorError> {
            unimplemented!()
        }
        fn dump_inodes(&self) -> Result<String, CollaboratorError> {
            unimplemented!()
        }
        fn force_stop(&self, _: &str) -> Result<(), CollaboratorError> {
            unimplemented!()
        }
        fn drop_caches(&self) -> Result<(), CollaboratorError> {
            unimplemented!()
        }
        fn pull(&self, _: &str, _: &Path) -> Result<(), CollaboratorError> {
            unimplemented!()
        }
        fn file_size(&self, remote: &str) -> Result<u64, CollaboratorError> {
            self.queries.borrow_mut().push(remote.to_string());
            self.sizes.get(remote).copied().ok_or_else(|| CollaboratorError::UnexpectedOutput {
                command: format!("wc -c {remote}"),
                output: "No such file or directory".to_string(),
            })
        }
        fn abi(&self) -> Result<String, CollaboratorError> {
            unimplemented!()
        }
    }

    const APK: &str = "/data/app/com.x-1/base.apk";
    const VDEX: &str = "/data/app/com.x-1/oat/arm64/base.vdex";
    const LIB: &str = "/data/app/com.x-1/lib/arm64/libx.so";
    const GONE: &str = "/data/app/com.x-1/lib/arm64/libgone.so";

    fn device() -> SizeOnlyDevice {
        SizeOnlyDevice {
            sizes: HashMap::from([(APK, 1 << 20), (VDEX, 65_536), (LIB, 12_288)]),
            queries: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_whole_files_are_queried_once() {
        let device = device();
        let files: Vec<String> = [VDEX, "/system/lib64/libc.so", LIB, VDEX, GONE, "/data/a.db"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let records = build_file_sizes(&device, &files, &StagedArchives::default());

        assert_eq!(
            records,
            vec![FileSizeRecord::whole_file(VDEX, 65_536), FileSizeRecord::whole_file(LIB, 12_288)]
        );
        assert_eq!(*device.queries.borrow(), vec![VDEX, LIB, GONE]);
    }

    #[test]
    fn test_staged_archive_is_listed_by_entry() {
        let device = device();
        let mut staged = StagedArchives::default();
        staged.insert(StagedArchive {
            remote_path: APK.to_string(),
            local_path: PathBuf::from("artifacts/data/app/com.x-1/base.apk"),
            table: ArchiveEntryTable::from_entries(vec![
                ArchiveEntry { name: "classes.dex".to_string(), offset: 0, size: 900 },
                ArchiveEntry { name: "resources.arsc".to_string(), offset: 950, size: 40 },
            ]),
        });

        let records = build_file_sizes(&device, &[APK.to_string(), LIB.to_string()], &staged);

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].zip_entry_name.as_deref(), Some("resources.arsc"));
        assert_eq!(records[1].file_offset, 950);
        assert_eq!(records[2], FileSizeRecord::whole_file(LIB, 12_288));
        assert_eq!(*device.queries.borrow(), vec![LIB]);
    }

    #[test]
    fn test_unstaged_archive_gets_whole_file_size() {
        let device = device();
        let records = build_file_sizes(&device, &[APK.to_string()], &StagedArchives::default());
        assert_eq!(records, vec![FileSizeRecord::whole_file(APK, 1 << 20)]);
    }
}
