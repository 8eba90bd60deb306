//! The two end-to-end operations behind the CLI.
//!
//! ```text
//! collect: force-stop → drop caches → record trace → snapshot (maps | inodes)
//! process: query trace → parse log → layout index → [stage APKs]
//!          → file_sizes.csv → resolve → mapped_faults.csv
//! ```
//!
//! Mandatory steps (trace capture, snapshot, query, parsing) abort the run.
//! Optional ones (archive staging, per-file size queries) log and continue.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use faultmap_common::{MappedFaultRecord, TableWriter, FILE_SIZES_FILE, MAPPED_FAULTS_FILE};

use crate::archive::{stage_archives, StagedArchives};
use crate::catalog::{build_file_sizes, write_file_sizes};
use crate::device::trace_capture::TRACE_FILE;
use crate::device::trace_query::{FAULT_LOG_FILE, QUERY_FILE};
use crate::device::{fault_query, record_trace, run_trace_query, Device, TraceCapture};
use crate::domain::CaptureMode;
use crate::layout::{LayoutIndex, INODES_FILE, MAPS_FILE};
use crate::preflight::{check_collected, check_tool, check_trace_config};
use crate::resolver::{FaultResolver, ResolutionContext, ResolutionStats, ResolverConfig};
use crate::trace_data::load_fault_log;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub package: String,
    pub output_dir: PathBuf,
    pub trace_config: PathBuf,
    pub record_tool: PathBuf,
    pub serial: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub package: String,
    pub output_dir: PathBuf,
    pub pull_apks: bool,
    pub trace_processor: PathBuf,
    pub config: ResolverConfig,
    /// Overrides the device architecture probe
    pub mode: Option<CaptureMode>,
}

/// Capture mode from an explicit override or the device's ABI
///
/// # Errors
/// Returns an error if no override is given and the ABI cannot be read
pub fn detect_mode(device: &dyn Device, mode: Option<CaptureMode>) -> Result<CaptureMode> {
    if let Some(mode) = mode {
        return Ok(mode);
    }
    let abi = device.abi().context("Failed to read the device architecture")?;
    let mode = CaptureMode::for_abi(&abi);
    info!("Device ABI {abi}: {mode} mode");
    Ok(mode)
}

/// Record a startup trace and the matching layout snapshot.
///
/// The output directory is deleted and recreated.
///
/// # Errors
/// Returns an error if any step fails; all of them are required
pub async fn run_collect(device: &dyn Device, opts: &CollectOptions) -> Result<CaptureMode> {
    check_tool(&opts.record_tool, "record_android_trace")?;
    check_trace_config(&opts.trace_config)?;
    let mode = detect_mode(device, None)?;

    match fs::remove_dir_all(&opts.output_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to clear {}", opts.output_dir.display()))
        }
    }
    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("Failed to create {}", opts.output_dir.display()))?;

    device.force_stop(&opts.package).context("Failed to stop the package")?;
    device.drop_caches().context("Failed to drop the page cache")?;

    info!("Recording trace, launch {} now...", opts.package);
    let capture = TraceCapture {
        tool: opts.record_tool.clone(),
        config: opts.trace_config.clone(),
        output: opts.output_dir.join(TRACE_FILE),
        serial: opts.serial.clone(),
    };
    record_trace(&capture).await.context("Trace capture failed")?;

    match mode {
        CaptureMode::Inode => {
            info!("Dumping inodes...");
            let inodes = device.dump_inodes().context("Failed to dump the inode table")?;
            write_snapshot(&opts.output_dir.join(INODES_FILE), inodes.trim())?;
        }
        CaptureMode::Address => {
            let pid = device.pid_of(&opts.package).context("Failed to find the package PID")?;
            let maps = device.read_maps(pid).context("Failed to read the memory map")?;
            write_snapshot(&opts.output_dir.join(MAPS_FILE), &maps)?;
        }
    }

    Ok(mode)
}

fn write_snapshot(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Query the collected trace and resolve its faults.
///
/// # Errors
/// Returns an error if the query, parsing or output writing fails
pub fn run_process(device: &dyn Device, opts: &ProcessOptions) -> Result<ResolutionStats> {
    let mode = detect_mode(device, opts.mode)?;
    let dir = &opts.output_dir;
    check_collected(dir, mode)?;
    check_tool(&opts.trace_processor, "trace_processor")?;

    run_trace_query(
        &opts.trace_processor,
        &fault_query(mode, &opts.package),
        &dir.join(QUERY_FILE),
        &dir.join(TRACE_FILE),
        &dir.join(FAULT_LOG_FILE),
    )
    .context("Trace query failed")?;

    resolve_capture(device, dir, mode, opts.config, opts.pull_apks)
}

/// Resolve an already-queried capture in `dir` (everything after the trace query).
///
/// # Errors
/// Returns an error if the fault log or snapshot is missing or malformed, or
/// an output file cannot be written
pub fn resolve_capture(
    device: &dyn Device,
    dir: &Path,
    mode: CaptureMode,
    config: ResolverConfig,
    pull_apks: bool,
) -> Result<ResolutionStats> {
    let events = load_fault_log(&dir.join(FAULT_LOG_FILE), mode, config.page_size())?;
    info!("{} fault events", events.len());

    let layout = LayoutIndex::load(mode, dir)?;
    let files = layout.candidate_files(&events);

    let archives =
        if pull_apks { stage_archives(device, &files, dir) } else { StagedArchives::default() };

    let sizes = build_file_sizes(device, &files, &archives);
    write_file_sizes(&dir.join(FILE_SIZES_FILE), &sizes)?;

    let resolver = FaultResolver::new(&layout, &archives);
    let mut ctx = ResolutionContext::new(config);
    let mut writer = TableWriter::create::<MappedFaultRecord>(&dir.join(MAPPED_FAULTS_FILE))?;
    resolver.resolve_all(&mut ctx, &events, |fault| writer.write(&MappedFaultRecord::from(fault)))?;
    let rows = writer.rows();
    writer.finish()?;
    info!(
        "Wrote {rows} faults to {MAPPED_FAULTS_FILE} ({} pages modelled resident)",
        ctx.page_cache().resident_pages()
    );

    Ok(ctx.stats)
}
