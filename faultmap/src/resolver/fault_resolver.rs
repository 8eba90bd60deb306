//! # Fault Resolution
//!
//! Turns the raw fault log into the resolved fault stream, one event at a
//! time and in log order:
//!
//! ```text
//! RawFaultEvent
//!     │ LayoutIndex::locate        miss → Dropped(LookupMiss)
//!     ▼
//! (file, offset)
//!     │ is_maybe_package_code      no   → Dropped(IrrelevantFile)
//!     ▼
//! EntryIndex::find (staged APKs only)
//!     │
//!     ▼
//! PageCacheModel::touch            → is_major
//!     │
//!     ▼
//! Resolved(ResolvedFault)
//! ```
//!
//! All mutable state lives in the [`ResolutionContext`] passed in by the
//! caller, so two runs never share classification state.

use log::debug;
use std::collections::HashMap;

use faultmap_common::MappedFaultRecord;

use super::page_cache::{PageCacheModel, ResolverConfig};
use super::stats::ResolutionStats;
use crate::archive::{EntryIndex, StagedArchives};
use crate::classification::is_maybe_package_code;
use crate::domain::Timestamp;
use crate::layout::LayoutIndex;
use crate::trace_data::RawFaultEvent;

/// A fault attributed to a file region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFault {
    pub ts: Timestamp,
    pub process_name: String,
    pub thread_name: String,
    pub file: String,
    /// Archive entry containing `offset`, when the file is a staged archive
    pub sub_entry: Option<String>,
    /// Byte offset within `file`
    pub offset: u64,
    pub is_major: bool,
}

impl From<ResolvedFault> for MappedFaultRecord {
    fn from(fault: ResolvedFault) -> Self {
        MappedFaultRecord {
            ts: fault.ts.0,
            process_name: fault.process_name,
            thread_name: fault.thread_name,
            file_name: fault.file,
            zip_entry_name: fault.sub_entry,
            offset: fault.offset,
            is_major: fault.is_major,
        }
    }
}

impl From<MappedFaultRecord> for ResolvedFault {
    fn from(record: MappedFaultRecord) -> Self {
        ResolvedFault {
            ts: Timestamp(record.ts),
            process_name: record.process_name,
            thread_name: record.thread_name,
            file: record.file_name,
            sub_entry: record.zip_entry_name,
            offset: record.offset,
            is_major: record.is_major,
        }
    }
}

/// Why an event produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No map region or inode table entry for the event
    LookupMiss,
    /// Resolved to a platform file or a non-code file
    IrrelevantFile,
}

/// Outcome of resolving one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedFault),
    Dropped(DropReason),
}

/// Per-run mutable state: resident pages and counters
#[derive(Debug, Default)]
pub struct ResolutionContext {
    cache: PageCacheModel,
    pub stats: ResolutionStats,
}

impl ResolutionContext {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { cache: PageCacheModel::new(config), stats: ResolutionStats::default() }
    }

    #[must_use]
    pub fn page_cache(&self) -> &PageCacheModel {
        &self.cache
    }
}

/// Resolves events against one layout snapshot and its staged archives
pub struct FaultResolver<'a> {
    layout: &'a LayoutIndex,
    entries: HashMap<&'a str, EntryIndex>,
}

impl<'a> FaultResolver<'a> {
    #[must_use]
    pub fn new(layout: &'a LayoutIndex, archives: &'a StagedArchives) -> Self {
        let entries = archives
            .iter()
            .filter(|a| !a.table.is_empty())
            .map(|a| (a.remote_path.as_str(), EntryIndex::new(&a.table)))
            .collect();
        Self { layout, entries }
    }

    /// Resolve and classify a single event.
    pub fn resolve(&self, ctx: &mut ResolutionContext, event: &RawFaultEvent) -> Resolution {
        let resolution = self.resolve_inner(ctx, event);
        ctx.stats.record(&resolution);
        resolution
    }

    fn resolve_inner(&self, ctx: &mut ResolutionContext, event: &RawFaultEvent) -> Resolution {
        let Some(location) = self.layout.locate(event.target) else {
            debug!(
                "No {} layout entry for {} at ts {}",
                self.layout.mode(),
                event.target,
                event.ts.0
            );
            return Resolution::Dropped(DropReason::LookupMiss);
        };

        if !is_maybe_package_code(location.path) {
            return Resolution::Dropped(DropReason::IrrelevantFile);
        }

        let sub_entry = self
            .entries
            .get(location.path)
            .and_then(|index| index.find(location.offset))
            .map(|entry| entry.name.clone());

        let is_major = ctx.cache.touch(location.path, location.offset);

        Resolution::Resolved(ResolvedFault {
            ts: event.ts,
            process_name: event.process_name.clone(),
            thread_name: event.thread_name.clone(),
            file: location.path.to_string(),
            sub_entry,
            offset: location.offset,
            is_major,
        })
    }

    /// Resolve `events` in order, handing each resolved fault to `sink`.
    ///
    /// # Errors
    /// Stops at and returns the first error from `sink`
    pub fn resolve_all<E>(
        &self,
        ctx: &mut ResolutionContext,
        events: &[RawFaultEvent],
        mut sink: impl FnMut(ResolvedFault) -> Result<(), E>,
    ) -> Result<(), E> {
        for event in events {
            if let Resolution::Resolved(fault) = self.resolve(ctx, event) {
                sink(fault)?;
            }
        }
        Ok(())
    }
}
