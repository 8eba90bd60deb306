//! Trace capture with `record_android_trace`
//!
//! The capture runs on the device until the config's duration elapses or
//! the user presses Ctrl+C. The signal also reaches the capture script,
//! which then stops tracing on the device; we keep waiting for it so the
//! device is not left with a trace session running.

use log::{info, warn};
use std::path::PathBuf;
use std::process::Stdio;

use crate::domain::CollaboratorError;

/// Trace file written by `collect`
pub const TRACE_FILE: &str = "faults.pftrace";

/// Parameters of one capture
#[derive(Debug, Clone)]
pub struct TraceCapture {
    /// `record_android_trace` script
    pub tool: PathBuf,
    /// Perfetto config enabling the fault tracepoints
    pub config: PathBuf,
    pub output: PathBuf,
    pub serial: Option<String>,
}

impl TraceCapture {
    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.tool);
        cmd.arg("-c").arg(&self.config).arg("-n").arg("-o").arg(&self.output).arg("-tt");
        if let Some(serial) = &self.serial {
            cmd.arg("--serial").arg(serial);
        }
        cmd.stdin(Stdio::piped());
        cmd
    }
}

/// Record a trace, returning once the capture tool has exited.
///
/// # Errors
/// Returns an error if the tool cannot be started, or exits unsuccessfully
/// without having been interrupted
pub async fn record_trace(capture: &TraceCapture) -> Result<(), CollaboratorError> {
    let program = capture.tool.display().to_string();
    let mut child = capture
        .command()
        .spawn()
        .map_err(|source| CollaboratorError::Launch { program: program.clone(), source })?;

    let wait_error = |source| CollaboratorError::Launch { program: program.clone(), source };

    let mut interrupted = false;
    let status = tokio::select! {
        status = child.wait() => status.map_err(wait_error)?,
        _ = tokio::signal::ctrl_c() => {
            interrupted = true;
            info!("Interrupted, waiting for the capture to stop...");
            child.wait().await.map_err(wait_error)?
        }
    };

    if status.success() {
        info!("Trace written to {}", capture.output.display());
        return Ok(());
    }
    if interrupted {
        warn!("Capture tool exited with {status} after interrupt");
        return Ok(());
    }
    Err(CollaboratorError::Failed {
        command: format!("{:?}", capture.command().as_std()),
        status: status.to_string(),
        stderr: String::new(),
    })
}
