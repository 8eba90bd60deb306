//! Page cache presence model used for major/minor classification.
//!
//! No eviction and one fixed read-ahead window. A fault on a page that is
//! not yet resident is major; every fault then marks its own page plus the
//! next `readahead_pages` pages resident.
//!
//! ```text
//! fault @ page 10 (major) → resident: 10..=42
//! fault @ page 30 (minor) → resident: 10..=62
//! fault @ page 70 (major) → resident: 10..=62, 70..=102
//! ```

use std::collections::{HashMap, HashSet};

use faultmap_common::{DEFAULT_PAGE_SIZE, DEFAULT_READAHEAD_PAGES};

/// Largest accepted read-ahead window (64 MiB at 4 KiB pages)
pub const MAX_READAHEAD_PAGES: u64 = 16_384;

/// Parameters of the page cache model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Bytes per page, a non-zero power of two
    page_size: u64,
    /// Pages marked resident after the faulting page
    readahead_pages: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, readahead_pages: DEFAULT_READAHEAD_PAGES }
    }
}

impl ResolverConfig {
    /// # Errors
    /// Returns a message if `page_size` is not a non-zero power of two or
    /// `readahead_pages` exceeds [`MAX_READAHEAD_PAGES`]
    pub fn new(page_size: u64, readahead_pages: u64) -> Result<Self, String> {
        if !page_size.is_power_of_two() {
            return Err(format!("page size must be a power of two, got {page_size}"));
        }
        if readahead_pages > MAX_READAHEAD_PAGES {
            return Err(format!(
                "read-ahead window of {readahead_pages} pages exceeds {MAX_READAHEAD_PAGES}"
            ));
        }
        Ok(Self { page_size, readahead_pages })
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn readahead_pages(&self) -> u64 {
        self.readahead_pages
    }

    /// Page number holding byte `offset`
    #[must_use]
    pub fn page_of(&self, offset: u64) -> u64 {
        offset / self.page_size
    }
}

/// Interned file identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileId(u32);

/// Resident pages keyed by (file, page number), for one processing run
#[derive(Debug, Default)]
pub struct PageCacheModel {
    config: ResolverConfig,
    files: HashMap<String, FileId>,
    resident: HashSet<(FileId, u64)>,
}

impl PageCacheModel {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { config, files: HashMap::new(), resident: HashSet::new() }
    }

    /// Record a fault at byte `offset` of `file`, returning true if it was major.
    pub fn touch(&mut self, file: &str, offset: u64) -> bool {
        let id = self.intern(file);
        let page = self.config.page_of(offset);
        let is_major = !self.resident.contains(&(id, page));

        for n in 0..=self.config.readahead_pages {
            let Some(next) = page.checked_add(n) else { break };
            self.resident.insert((id, next));
        }

        is_major
    }

    #[cfg(test)]
    fn is_resident(&self, file: &str, offset: u64) -> bool {
        self.files
            .get(file)
            .is_some_and(|id| self.resident.contains(&(*id, self.config.page_of(offset))))
    }

    /// Number of (file, page) pairs marked resident
    #[must_use]
    pub fn resident_pages(&self) -> usize {
        self.resident.len()
    }

    fn intern(&mut self, file: &str) -> FileId {
        if let Some(id) = self.files.get(file) {
            return *id;
        }
        let id = FileId(u32::try_from(self.files.len()).unwrap_or(u32::MAX));
        self.files.insert(file.to_string(), id);
        id
    }
}
