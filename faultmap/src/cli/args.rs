//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use faultmap_common::{DEFAULT_PAGE_SIZE, DEFAULT_READAHEAD_PAGES};

use crate::domain::CaptureMode;
use crate::pipeline::{CollectOptions, ProcessOptions};
use crate::resolver::{ResolverConfig, MAX_READAHEAD_PAGES};

#[derive(Parser)]
#[command(
    name = "faultmap",
    about = "Attribute app-startup page faults to files and APK entries",
    after_help = "\
EXAMPLES:
    faultmap collect --package com.example          Record a cold-start trace
    faultmap process --package com.example --pull-apks
                                                    Map faults, APK entries included
    faultmap -s emulator-5554 collect -p com.example  Target one device"
)]
pub struct Args {
    /// Device serial, for when more than one device is attached
    #[arg(short, long, global = true)]
    pub serial: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// adb binary to drive the device with
    #[arg(long, value_name = "PATH", global = true, default_value = "adb")]
    pub adb: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Cold-start the package under a page-fault trace and snapshot its file layout
    Collect(CollectArgs),
    /// Resolve a collected trace into mapped_faults.csv and file_sizes.csv
    Process(ProcessArgs),
}

#[derive(ClapArgs)]
pub struct CollectArgs {
    /// Package to trace
    #[arg(short, long)]
    pub package: String,

    /// Output directory (replaced on every run)
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Perfetto config for the capture
    #[arg(long, value_name = "FILE", default_value = "ftrace.config")]
    pub trace_config: PathBuf,

    /// Path to record_android_trace
    #[arg(long, value_name = "FILE", default_value = "./record_android_trace")]
    pub record_tool: PathBuf,
}

#[derive(ClapArgs)]
pub struct ProcessArgs {
    /// Package the trace was recorded for
    #[arg(short, long)]
    pub package: String,

    /// Directory holding the collected capture
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Pull the traced APKs so faults can be attributed to archive entries
    #[arg(long)]
    pub pull_apks: bool,

    /// Path to trace_processor
    #[arg(long, value_name = "FILE", default_value = "./trace_processor")]
    pub trace_processor: PathBuf,

    /// Device page size in bytes
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    pub page_size: u64,

    /// Pages assumed resident after each fault
    #[arg(long, default_value_t = DEFAULT_READAHEAD_PAGES, value_parser = parse_readahead_pages)]
    pub readahead_pages: u64,

    /// Resolution mode (detected from the device ABI if omitted)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<CaptureMode>,
}

fn parse_page_size(s: &str) -> Result<u64, String> {
    let size: u64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !size.is_power_of_two() {
        return Err(format!("{size} is not a power of two"));
    }
    Ok(size)
}

fn parse_readahead_pages(s: &str) -> Result<u64, String> {
    let pages: u64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if pages > MAX_READAHEAD_PAGES {
        return Err(format!("at most {MAX_READAHEAD_PAGES} pages"));
    }
    Ok(pages)
}

fn parse_mode(s: &str) -> Result<CaptureMode, String> {
    s.parse::<CaptureMode>().map_err(|e| e.to_string())
}

impl CollectArgs {
    #[must_use]
    pub fn to_options(&self, serial: Option<String>) -> CollectOptions {
        CollectOptions {
            package: self.package.clone(),
            output_dir: self.output.clone(),
            trace_config: self.trace_config.clone(),
            record_tool: self.record_tool.clone(),
            serial,
        }
    }
}

impl ProcessArgs {
    /// # Errors
    /// Returns an error if the page cache parameters are invalid
    pub fn to_options(&self) -> Result<ProcessOptions, String> {
        Ok(ProcessOptions {
            package: self.package.clone(),
            output_dir: self.output.clone(),
            pull_apks: self.pull_apks,
            trace_processor: self.trace_processor.clone(),
            config: ResolverConfig::new(self.page_size, self.readahead_pages)?,
            mode: self.mode,
        })
    }
}
