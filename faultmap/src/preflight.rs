//! Pre-flight checks for faultmap
//!
//! Validates that the host tools and collected files exist before starting
//! a long capture or query, with actionable messages when they don't.

use anyhow::{bail, Result};
use std::path::Path;

use crate::device::trace_capture::TRACE_FILE;
use crate::domain::CaptureMode;
use crate::layout::{INODES_FILE, MAPS_FILE};

/// Check that a host tool given by path exists.
///
/// Bare names (no `/`) are left to `PATH` lookup at spawn time.
pub fn check_tool(tool: &Path, what: &str) -> Result<()> {
    let is_path = tool.components().count() > 1;
    if is_path && !tool.is_file() {
        bail!(
            "{what} not found: {}\n\n\
             Download it from https://perfetto.dev/docs/ and pass its location \
             with the matching command-line option.",
            tool.display()
        );
    }
    Ok(())
}

/// Check that the trace capture config exists
pub fn check_trace_config(config: &Path) -> Result<()> {
    if !config.is_file() {
        bail!(
            "Trace config not found: {}\n\n\
             The config must enable the page_fault_user (x86) or \
             mm_filemap_add_to_page_cache (ARM) ftrace events.",
            config.display()
        );
    }
    Ok(())
}

/// Check that `collect` left what `process` needs in `output_dir`
pub fn check_collected(output_dir: &Path, mode: CaptureMode) -> Result<()> {
    let snapshot = match mode {
        CaptureMode::Address => MAPS_FILE,
        CaptureMode::Inode => INODES_FILE,
    };
    for file in [TRACE_FILE, snapshot] {
        let path = output_dir.join(file);
        if !path.is_file() {
            bail!(
                "Missing {}\n\n\
                 Run `faultmap collect` for this package first ({mode} mode expects {file}).",
                path.display()
            );
        }
    }
    Ok(())
}
