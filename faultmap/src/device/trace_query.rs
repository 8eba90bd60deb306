//! Raw fault log extraction with `trace_processor`
//!
//! Faults are restricted to the package's own threads and to the window of
//! its first startup, as reported by the `android.startup.startups` module.

use log::info;
use std::fs::{self, File};
use std::path::Path;
use std::process::Command;

use crate::domain::{CaptureMode, CollaboratorError};

/// Query text written next to the trace for reproducibility
pub const QUERY_FILE: &str = "query.sql";

/// Raw fault log written by the query
pub const FAULT_LOG_FILE: &str = "faults.csv";

/// SQL selecting the fault events of `package` during its first startup.
#[must_use]
pub fn fault_query(mode: CaptureMode, package: &str) -> String {
    let (event, columns) = match mode {
        CaptureMode::Address => (
            "page_fault_user",
            r#"EXTRACT_ARG(ftrace_event.arg_set_id, "address") AS address,
        EXTRACT_ARG(ftrace_event.arg_set_id, "ip") AS ip"#,
        ),
        CaptureMode::Inode => (
            "mm_filemap_add_to_page_cache",
            r#"EXTRACT_ARG(ftrace_event.arg_set_id, "s_dev") AS sdev,
        EXTRACT_ARG(ftrace_event.arg_set_id, "i_ino") AS inode,
        EXTRACT_ARG(ftrace_event.arg_set_id, "index") AS "index""#,
        ),
    };
    let package = package.replace('\'', "''");

    format!(
        r"INCLUDE PERFETTO MODULE android.startup.startups;

SELECT
        ftrace_event.ts,
        process.name AS process_name,
        thread.name AS thread_name,
        {columns}
FROM ftrace_event
    LEFT JOIN thread ON ftrace_event.utid = thread.utid
    LEFT JOIN process ON thread.upid = process.upid
WHERE
    ftrace_event.name = '{event}'
    AND ftrace_event.ts >= (SELECT MIN(ts) FROM android_startups WHERE package = process.name)
    AND ftrace_event.ts <= (SELECT MIN(ts_end) FROM android_startups WHERE package = process.name)
    AND process.name = '{package}'
ORDER BY ts ASC
"
    )
}

/// Run the fault query against `trace`, writing the CSV result to `fault_log`.
///
/// # Errors
/// Returns an error if the query or output file cannot be written, or the
/// trace processor fails
pub fn run_trace_query(
    tool: &Path,
    query: &str,
    query_path: &Path,
    trace: &Path,
    fault_log: &Path,
) -> Result<(), CollaboratorError> {
    fs::write(query_path, query)
        .map_err(|source| CollaboratorError::Output { path: query_path.to_path_buf(), source })?;
    let stdout = File::create(fault_log)
        .map_err(|source| CollaboratorError::Output { path: fault_log.to_path_buf(), source })?;

    let mut cmd = Command::new(tool);
    cmd.arg("-q").arg(query_path).arg(trace).stdout(stdout);
    info!("Querying {}...", trace.display());

    let output = cmd.output().map_err(|source| CollaboratorError::Launch {
        program: tool.display().to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(CollaboratorError::Failed {
            command: format!("{cmd:?}"),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
