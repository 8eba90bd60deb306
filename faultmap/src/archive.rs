//! # Archive Introspection
//!
//! APKs are zip archives mapped directly into memory, so a fault inside an
//! APK only becomes meaningful once it is attributed to the entry
//! (`classes.dex`, `resources.arsc`, `lib/arm64-v8a/libfoo.so`, ...) that
//! occupies that byte range.
//!
//! ## Entry Containment
//!
//! Entries are laid out contiguously, each starting at its local header:
//!
//! ```text
//! offset:  0            100                250
//!          ├────────────┼──────────────────┼──────────────▶
//!          │ entry A    │ entry B          │ entry C ...
//! ```
//!
//! A fault at offset `o` belongs to the entry with the greatest header
//! offset `<= o`. The directory is read in its stored order; the search
//! index sorts a copy by offset and binary-searches it.

use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::classification::is_maybe_package_code;
use crate::device::Device;
use crate::domain::ArchiveError;

/// Extension of the archives worth introspecting
pub const ARCHIVE_EXTENSION: &str = ".apk";

/// Directory under the output directory that staged archives are pulled into
pub const ARTIFACTS_DIR: &str = "artifacts";

/// One archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Offset of the entry's local header within the archive
    pub offset: u64,
    /// Compressed (on-disk) size
    pub size: u64,
}

/// Members of one archive, in central directory order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveEntryTable {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveEntryTable {
    /// Read the central directory of a local archive.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the file cannot be opened or is not a zip archive
    pub fn read(path: &Path) -> Result<Self, ArchiveError> {
        let file =
            File::open(path).map_err(|source| ArchiveError::Open { path: path.into(), source })?;
        let invalid = |source| ArchiveError::Invalid { path: path.into(), source };

        let mut archive = zip::ZipArchive::new(file).map_err(invalid)?;
        let mut entries = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let member = archive.by_index_raw(idx).map_err(invalid)?;
            entries.push(ArchiveEntry {
                name: member.name().to_string(),
                offset: member.header_start(),
                size: member.compressed_size(),
            });
        }

        Ok(Self { entries })
    }

    #[must_use]
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Offset-sorted view of an [`ArchiveEntryTable`] for containment queries
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    sorted: Vec<ArchiveEntry>,
}

impl EntryIndex {
    #[must_use]
    pub fn new(table: &ArchiveEntryTable) -> Self {
        let mut sorted = table.entries.clone();
        sorted.sort_by_key(|e| e.offset);
        Self { sorted }
    }

    /// Entry whose byte range contains `offset`.
    ///
    /// An offset equal to an entry's header offset belongs to that entry.
    /// Anything past the last header belongs to the last entry. Offsets
    /// before the first header (or an empty table) have no entry.
    #[must_use]
    pub fn find(&self, offset: u64) -> Option<&ArchiveEntry> {
        let after = self.sorted.partition_point(|e| e.offset <= offset);
        after.checked_sub(1).map(|idx| &self.sorted[idx])
    }
}

/// An archive pulled from the device and introspected
#[derive(Debug, Clone)]
pub struct StagedArchive {
    /// Path on the device, as seen in the layout index
    pub remote_path: String,
    pub local_path: PathBuf,
    pub table: ArchiveEntryTable,
}

/// Archives available for sub-entry resolution, in staging order
#[derive(Debug, Clone, Default)]
pub struct StagedArchives {
    archives: Vec<StagedArchive>,
}

impl StagedArchives {
    pub fn insert(&mut self, archive: StagedArchive) {
        if self.get(&archive.remote_path).is_none() {
            self.archives.push(archive);
        }
    }

    #[must_use]
    pub fn get(&self, remote_path: &str) -> Option<&ArchiveEntryTable> {
        self.archives.iter().find(|a| a.remote_path == remote_path).map(|a| &a.table)
    }

    #[must_use]
    pub fn contains(&self, remote_path: &str) -> bool {
        self.get(remote_path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedArchive> {
        self.archives.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}

/// Local path an archive at `remote_path` is staged to.
///
/// The full remote path is mirrored so that the many `base.apk` files of
/// different packages do not overwrite each other.
#[must_use]
pub fn staging_path(output_dir: &Path, remote_path: &str) -> PathBuf {
    output_dir.join(ARTIFACTS_DIR).join(remote_path.trim_start_matches('/'))
}

/// Pull every relevant archive among `files` and read its entry table.
///
/// Failures are logged and the archive is left out; faults against it are
/// still resolved at file level.
pub fn stage_archives(device: &dyn Device, files: &[String], output_dir: &Path) -> StagedArchives {
    info!("Pulling APKs...");
    let mut staged = StagedArchives::default();

    for remote_path in files {
        if !remote_path.ends_with(ARCHIVE_EXTENSION)
            || !is_maybe_package_code(remote_path)
            || staged.contains(remote_path)
        {
            continue;
        }

        let local_path = staging_path(output_dir, remote_path);
        if let Some(parent) = local_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create {}: {e}", parent.display());
                continue;
            }
        }

        if let Err(e) = device.pull(remote_path, &local_path) {
            warn!("Failed to pull {remote_path}: {e}");
            continue;
        }

        match ArchiveEntryTable::read(&local_path) {
            Ok(table) => {
                let archive =
                    StagedArchive { remote_path: remote_path.clone(), local_path, table };
                info!(
                    "{remote_path}: {} entries, staged at {}",
                    archive.table.entries().len(),
                    archive.local_path.display()
                );
                staged.insert(archive);
            }
            Err(e) => warn!("Skipping {remote_path}: {e}"),
        }
    }

    info!("{} archives staged", staged.len());
    staged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, offset: u64, size: u64) -> ArchiveEntry {
        ArchiveEntry { name: name.to_string(), offset, size }
    }

    fn sample_index() -> EntryIndex {
        EntryIndex::new(&ArchiveEntryTable::from_entries(vec![
            entry("AndroidManifest.xml", 0, 100),
            entry("classes.dex", 100, 150),
            entry("resources.arsc", 250, 4000),
        ]))
    }

    #[test]
    fn test_find_inside_entries() {
        let index = sample_index();
        assert_eq!(index.find(260).unwrap().name, "resources.arsc");
        assert_eq!(index.find(99).unwrap().name, "AndroidManifest.xml");
        assert_eq!(index.find(1_000_000).unwrap().name, "resources.arsc");
    }

    #[test]
    fn test_find_boundary_belongs_to_starting_entry() {
        let index = sample_index();
        assert_eq!(index.find(100).unwrap().name, "classes.dex");
        assert_eq!(index.find(0).unwrap().name, "AndroidManifest.xml");
    }

    #[test]
    fn test_find_before_first_entry_and_empty() {
        let index = EntryIndex::new(&ArchiveEntryTable::from_entries(vec![entry("a", 30, 10)]));
        assert!(index.find(29).is_none());
        assert!(EntryIndex::default().find(0).is_none());
    }

    #[test]
    fn test_find_with_unsorted_directory() {
        let index = EntryIndex::new(&ArchiveEntryTable::from_entries(vec![
            entry("late", 500, 10),
            entry("early", 0, 500),
        ]));
        assert_eq!(index.find(499).unwrap().name, "early");
        assert_eq!(index.find(500).unwrap().name, "late");
    }

    #[test]
    fn test_staging_path_mirrors_remote_layout() {
        let path = staging_path(Path::new("out"), "/data/app/~~a==/com.x-1/base.apk");
        assert_eq!(path, Path::new("out/artifacts/data/app/~~a==/com.x-1/base.apk"));
    }

    #[test]
    fn test_read_rejects_non_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.apk");
        fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(ArchiveEntryTable::read(&path), Err(ArchiveError::Invalid { .. })));
        assert!(matches!(
            ArchiveEntryTable::read(&dir.path().join("missing.apk")),
            Err(ArchiveError::Open { .. })
        ));
    }
}
