//! File origin classification for separating app code from the platform.
//!
//! Every process maps hundreds of platform files (libc, the ART runtime,
//! framework jars) and faults against them are expected background noise
//! when diagnosing an app's startup. Only files that may hold the app's own
//! code are kept.
//!
//! # Classification Strategy
//!
//! 1. **Path prefix** - platform partitions are excluded outright
//!    - `/system/`, `/system_ext`, `/apex/`, `/vendor/`
//! 2. **Extension** - what remains must look like code or a code container
//!    - `.so` native library, `.vdex` pre-verified bytecode, `.apk` archive

/// Extensions of files that can hold package code
const PACKAGE_CODE_EXTENSIONS: &[&str] = &[".so", ".vdex", ".apk"];

/// Platform partitions whose files are never package code
const PLATFORM_PREFIXES: &[&str] = &["/system/", "/system_ext", "/apex/", "/vendor/"];

/// Origin of a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    /// Native library, vdex or APK outside the platform partitions
    PackageCode,
    /// Anything on a platform partition, regardless of type
    Platform,
    /// Outside the platform partitions, but not a code-bearing file type
    OtherFile,
}

impl FileOrigin {
    #[must_use]
    pub fn is_package_code(self) -> bool {
        matches!(self, FileOrigin::PackageCode)
    }
}

/// Classify a resolved file path.
///
/// ```ignore
/// classify_file("/system/lib64/libc.so");           // → FileOrigin::Platform
/// classify_file("/data/app/com.x-1/base.apk");      // → FileOrigin::PackageCode
/// classify_file("/data/data/com.x/databases/a.db"); // → FileOrigin::OtherFile
/// ```
#[must_use]
pub fn classify_file(path: &str) -> FileOrigin {
    if PLATFORM_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return FileOrigin::Platform;
    }
    if PACKAGE_CODE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return FileOrigin::PackageCode;
    }
    FileOrigin::OtherFile
}

/// True if faults against `path` are worth reporting.
#[must_use]
pub fn is_maybe_package_code(path: &str) -> bool {
    classify_file(path).is_package_code()
}
