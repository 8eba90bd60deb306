//! Run counters and their end-of-run display

use super::fault_resolver::{DropReason, Resolution};

/// Counters accumulated over one resolution pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub events: usize,
    pub emitted: usize,
    pub major: usize,
    pub minor: usize,
    pub with_sub_entry: usize,
    pub lookup_misses: usize,
    pub irrelevant: usize,
}

impl ResolutionStats {
    pub fn record(&mut self, resolution: &Resolution) {
        self.events += 1;
        match resolution {
            Resolution::Resolved(fault) => {
                self.emitted += 1;
                if fault.is_major {
                    self.major += 1;
                } else {
                    self.minor += 1;
                }
                if fault.sub_entry.is_some() {
                    self.with_sub_entry += 1;
                }
            }
            Resolution::Dropped(DropReason::LookupMiss) => self.lookup_misses += 1,
            Resolution::Dropped(DropReason::IrrelevantFile) => self.irrelevant += 1,
        }
    }
}

/// Print the end-of-run summary to stderr
pub fn display_statistics(stats: &ResolutionStats) {
    eprintln!(
        "faults: {} events, {} mapped ({} major, {} minor, {} in archive entries), \
         {} unresolved, {} outside package code",
        stats.events,
        stats.emitted,
        stats.major,
        stats.minor,
        stats.with_sub_entry,
        stats.lookup_misses,
        stats.irrelevant,
    );
}
