//! [`Device`] over the `adb` command line.

use log::{debug, warn};
use std::cell::OnceCell;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output};

use super::Device;
use crate::domain::CollaboratorError;

/// `adb root` prints this on user builds
const NO_ROOT_MARKER: &str = "adbd cannot run as root in production builds";

/// Partitions dumped into the inode table
const INODE_DUMP_ROOTS: &str = "/apex /system /data /vendor";

pub struct AdbDevice {
    program: String,
    serial: Option<String>,
    has_root: OnceCell<bool>,
}

impl AdbDevice {
    #[must_use]
    pub fn new(serial: Option<String>) -> Self {
        Self { program: "adb".to_string(), serial, has_root: OnceCell::new() }
    }

    /// Use a specific adb binary instead of the one on `PATH`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn exec<I, S>(&self, args: I) -> Result<(String, Output), CollaboratorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);

        let display = format!("{cmd:?}");
        debug!("Running {display}");
        let output = cmd
            .output()
            .map_err(|source| CollaboratorError::Launch { program: self.program.clone(), source })?;
        Ok((display, output))
    }

    /// Run adb and return stdout, failing on a non-zero exit
    fn run<I, S>(&self, args: I) -> Result<String, CollaboratorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.exec(args)?;
        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether adbd runs as root; probed once with `adb root`.
    fn has_root(&self) -> bool {
        *self.has_root.get_or_init(|| match self.exec(["root"]) {
            Ok((_, output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                !stdout.contains(NO_ROOT_MARKER) && !stderr.contains(NO_ROOT_MARKER)
            }
            Err(e) => {
                warn!("adb root failed, falling back to su: {e}");
                false
            }
        })
    }

    /// Shell arguments running `command` with root privileges
    fn privileged(&self, command: &str) -> Vec<String> {
        if self.has_root() {
            vec!["shell".to_string(), command.to_string()]
        } else {
            vec!["shell".to_string(), format!("su -c {}", shell_quote(command))]
        }
    }
}

impl Device for AdbDevice {
    fn pid_of(&self, package: &str) -> Result<u32, CollaboratorError> {
        let command = format!("pidof {}", shell_quote(package));
        let stdout = self.run(["shell", command.as_str()])?;
        first_token(&stdout).ok_or(CollaboratorError::UnexpectedOutput {
            command,
            output: format!("'{}' (is {package} running?)", stdout.trim()),
        })
    }

    fn read_maps(&self, pid: u32) -> Result<String, CollaboratorError> {
        self.run(self.privileged(&format!("cat /proc/{pid}/maps")))
    }

    fn dump_inodes(&self) -> Result<String, CollaboratorError> {
        let command = format!("find {INODE_DUMP_ROOTS} -print0 | xargs -0 stat -c '%d %i %n'");
        let (display, output) = self.exec(self.privileged(&command))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        // find exits non-zero when a single file vanishes mid-walk
        if !output.status.success() {
            if stdout.trim().is_empty() {
                return Err(CollaboratorError::Failed {
                    command: display,
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            warn!("Inode dump exited with {}, keeping partial output", output.status);
        }
        Ok(stdout)
    }

    fn force_stop(&self, package: &str) -> Result<(), CollaboratorError> {
        let command = format!("am force-stop {}", shell_quote(package));
        self.run(["shell", command.as_str()]).map(drop)
    }

    fn drop_caches(&self) -> Result<(), CollaboratorError> {
        self.run(self.privileged("echo 3 > /proc/sys/vm/drop_caches")).map(drop)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<(), CollaboratorError> {
        self.run([OsStr::new("pull"), OsStr::new(remote), local.as_os_str()]).map(drop)
    }

    fn file_size(&self, remote: &str) -> Result<u64, CollaboratorError> {
        let command = format!("wc -c {}", shell_quote(remote));
        let stdout = self.run(["shell", command.as_str()])?;
        first_token(&stdout)
            .ok_or(CollaboratorError::UnexpectedOutput { command, output: stdout.trim().into() })
    }

    fn abi(&self) -> Result<String, CollaboratorError> {
        Ok(self.run(["shell", "getprop ro.product.cpu.abi"])?.trim().to_string())
    }
}

/// Quote `s` for the device's `sh`
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn first_token<T: std::str::FromStr>(output: &str) -> Option<T> {
    output.split_whitespace().next()?.parse().ok()
}
