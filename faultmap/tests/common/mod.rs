//! Shared helpers for integration tests
#![allow(dead_code)]

use faultmap::device::Device;
use faultmap::domain::CollaboratorError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const APK: &str = "/data/app/~~abc==/com.example-1/base.apk";
pub const VDEX: &str = "/data/app/~~abc==/com.example-1/oat/arm64/base.vdex";
pub const X86_LIB: &str = "/data/app/~~abc==/com.example-1/lib/x86_64/libexample.so";
pub const ARM_LIB: &str = "/data/app/~~abc==/com.example-1/lib/arm64/libexample.so";

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// In-memory device: canned answers, local files standing in for pulls
#[derive(Default)]
pub struct FakeDevice {
    pub abi: String,
    pub pid: u32,
    pub maps: String,
    pub inodes: String,
    pub sizes: HashMap<String, u64>,
    /// remote path → local file copied on pull
    pub files: HashMap<String, PathBuf>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeDevice {
    pub fn new(abi: &str) -> Self {
        Self { abi: abi.to_string(), pid: 4242, ..Self::default() }
    }

    pub fn with_size(mut self, remote: &str, size: u64) -> Self {
        self.sizes.insert(remote.to_string(), size);
        self
    }

    pub fn with_file(mut self, remote: &str, local: &Path) -> Self {
        self.files.insert(remote.to_string(), local.to_path_buf());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn missing(command: String) -> CollaboratorError {
        CollaboratorError::Failed {
            command,
            status: "exit status: 1".to_string(),
            stderr: "No such file or directory".to_string(),
        }
    }
}

impl Device for FakeDevice {
    fn pid_of(&self, package: &str) -> Result<u32, CollaboratorError> {
        self.record(format!("pidof {package}"));
        Ok(self.pid)
    }

    fn read_maps(&self, pid: u32) -> Result<String, CollaboratorError> {
        self.record(format!("maps {pid}"));
        Ok(self.maps.clone())
    }

    fn dump_inodes(&self) -> Result<String, CollaboratorError> {
        self.record("dump_inodes".to_string());
        Ok(self.inodes.clone())
    }

    fn force_stop(&self, package: &str) -> Result<(), CollaboratorError> {
        self.record(format!("force-stop {package}"));
        Ok(())
    }

    fn drop_caches(&self) -> Result<(), CollaboratorError> {
        self.record("drop_caches".to_string());
        Ok(())
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<(), CollaboratorError> {
        self.record(format!("pull {remote}"));
        let source = self.files.get(remote).ok_or_else(|| Self::missing(format!("pull {remote}")))?;
        fs::copy(source, local).map_err(|source| CollaboratorError::Launch {
            program: "pull".to_string(),
            source,
        })?;
        Ok(())
    }

    fn file_size(&self, remote: &str) -> Result<u64, CollaboratorError> {
        self.record(format!("size {remote}"));
        self.sizes.get(remote).copied().ok_or_else(|| Self::missing(format!("wc -c {remote}")))
    }

    /// An empty ABI stands for a device that cannot be reached
    fn abi(&self) -> Result<String, CollaboratorError> {
        if self.abi.is_empty() {
            return Err(Self::missing("getprop ro.product.cpu.abi".to_string()));
        }
        Ok(self.abi.clone())
    }
}

/// Write an uncompressed archive holding `entries` in order
pub fn write_archive(path: &Path, entries: &[(&str, usize)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, len) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(&vec![b'x'; *len]).unwrap();
    }
    zip.finish().unwrap();
}
