mod common;

use common::{fixture, write_archive, FakeDevice, APK, ARM_LIB, VDEX, X86_LIB};
use faultmap::archive::{staging_path, ArchiveEntryTable};
use faultmap::domain::CaptureMode;
use faultmap::pipeline::{resolve_capture, run_process, ProcessOptions};
use faultmap::resolver::{ResolutionStats, ResolverConfig};
use faultmap_common::{extract_faults, load_mappings, FileSizeRecord};
use std::fs;
use std::path::{Path, PathBuf};

const APK_BASE: u64 = 0x7000_0000;

/// Copy a fixture into a capture directory under the name `process` expects
fn stage_fixture(dir: &Path, fixture_name: &str, as_name: &str) {
    fs::copy(fixture(fixture_name), dir.join(as_name)).unwrap();
}

fn address_capture(dir: &Path, extra_rows: &str) {
    stage_fixture(dir, "maps.txt", "maps.txt");
    let mut log = fs::read_to_string(fixture("faults_address.csv")).unwrap();
    log.push_str(extra_rows);
    fs::write(dir.join("faults.csv"), log).unwrap();
}

/// Local APK with a known layout, plus the central directory read back
fn local_apk(dir: &Path) -> (PathBuf, ArchiveEntryTable) {
    let path = dir.join("source.apk");
    write_archive(
        &path,
        &[("AndroidManifest.xml", 100), ("classes.dex", 9000), ("resources.arsc", 300)],
    );
    let table = ArchiveEntryTable::read(&path).unwrap();
    (path, table)
}

#[test]
fn test_address_mode_with_staged_archive() {
    let capture = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let (apk, table) = local_apk(scratch.path());
    let dex_offset = table.entries()[1].offset;

    // A fault inside classes.dex, then one at the very start of the archive
    let rows = format!(
        "1050,\"com.example\",\"com.example\",{},0\n\
         1060,\"com.example\",\"com.example\",{APK_BASE},0\n",
        APK_BASE + dex_offset + 10
    );
    address_capture(capture.path(), &rows);

    let device = FakeDevice::new("x86_64").with_file(APK, &apk).with_size(X86_LIB, 73_728);
    let stats = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Address,
        ResolverConfig::default(),
        true,
    )
    .unwrap();

    assert_eq!(
        stats,
        ResolutionStats {
            events: 6,
            emitted: 4,
            major: 2,
            minor: 2,
            with_sub_entry: 2,
            lookup_misses: 1,
            irrelevant: 1,
        }
    );
    assert!(staging_path(capture.path(), APK).is_file());

    let (faults, sizes) = load_mappings(capture.path()).unwrap();
    let summary: Vec<(u64, &str, Option<&str>, u64, bool)> = faults
        .iter()
        .map(|f| (f.ts, f.file_name.as_str(), f.zip_entry_name.as_deref(), f.offset, f.is_major))
        .collect();
    assert_eq!(
        summary,
        [
            (1010, X86_LIB, None, 0x2000, true),
            (1020, X86_LIB, None, 0x3000, false),
            (1050, APK, Some("classes.dex"), dex_offset + 10, true),
            (1060, APK, Some("AndroidManifest.xml"), 0, false),
        ]
    );

    // Archive entries first, then whole files; libc is platform code
    assert_eq!(sizes.len(), 4);
    assert!(sizes[..3].iter().all(|s| s.file_name == APK && s.zip_entry_name.is_some()));
    assert_eq!(sizes[1].zip_entry_name.as_deref(), Some("classes.dex"));
    assert_eq!(sizes[1].file_offset, dex_offset);
    assert_eq!(sizes[1].size, 9000);
    assert_eq!(sizes[3], FileSizeRecord::whole_file(X86_LIB, 73_728));

    // Only the relevant archive was pulled, and its size was never queried
    let calls = device.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("pull")).count(), 1);
    assert!(!calls.contains(&format!("size {APK}")));
    assert!(!calls.iter().any(|c| c.contains("/system/")));
}

#[test]
fn test_outputs_feed_fault_extraction() {
    let capture = tempfile::tempdir().unwrap();
    address_capture(capture.path(), "");

    let device = FakeDevice::new("x86_64").with_size(X86_LIB, 73_728);
    resolve_capture(&device, capture.path(), CaptureMode::Address, ResolverConfig::default(), false)
        .unwrap();

    let (faults, sizes) = load_mappings(capture.path()).unwrap();
    let selection = extract_faults(X86_LIB, None, &sizes, &faults, true, 4096).unwrap();
    assert_eq!(selection.size, 73_728);
    let pages: Vec<u64> = selection.faults.iter().map(|f| f.page).collect();
    assert_eq!(pages, [2, 3]);
    assert_eq!(selection.faults[0].ts, 0);
    assert_eq!(selection.faults[1].ts, 10);

    let majors = extract_faults(X86_LIB, None, &sizes, &faults, false, 4096).unwrap();
    assert_eq!(majors.faults.len(), 1);

    assert!(extract_faults(APK, Some("classes.dex"), &sizes, &faults, true, 4096).is_none());
}

#[test]
fn test_failed_pull_degrades_to_file_level() {
    let capture = tempfile::tempdir().unwrap();
    let rows = format!("1050,\"com.example\",\"com.example\",{},0\n", APK_BASE + 5000);
    address_capture(capture.path(), &rows);

    // No local copy for the APK: the pull fails, but its size is known
    let device =
        FakeDevice::new("x86_64").with_size(APK, 1 << 20).with_size(X86_LIB, 73_728);
    let stats = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Address,
        ResolverConfig::default(),
        true,
    )
    .unwrap();

    assert_eq!(stats.emitted, 3);
    assert_eq!(stats.with_sub_entry, 0);

    let (faults, sizes) = load_mappings(capture.path()).unwrap();
    let apk_fault = faults.iter().find(|f| f.file_name == APK).unwrap();
    assert_eq!(apk_fault.zip_entry_name, None);
    assert_eq!(apk_fault.offset, 5000);
    assert!(apk_fault.is_major);
    assert!(sizes.contains(&FileSizeRecord::whole_file(APK, 1 << 20)));
}

#[test]
fn test_inode_mode() {
    let capture = tempfile::tempdir().unwrap();
    stage_fixture(capture.path(), "inodes.txt", "inodes.txt");
    stage_fixture(capture.path(), "faults_inode.csv", "faults.csv");

    let device = FakeDevice::new("arm64-v8a").with_size(VDEX, 262_144).with_size(ARM_LIB, 16_384);
    let stats = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Inode,
        ResolverConfig::default(),
        false,
    )
    .unwrap();

    assert_eq!(
        stats,
        ResolutionStats {
            events: 8,
            emitted: 6,
            major: 3,
            minor: 3,
            with_sub_entry: 0,
            lookup_misses: 1,
            irrelevant: 1,
        }
    );

    let (faults, sizes) = load_mappings(capture.path()).unwrap();
    let summary: Vec<(&str, u64, bool)> =
        faults.iter().map(|f| (f.file_name.as_str(), f.offset, f.is_major)).collect();
    assert_eq!(
        summary,
        [
            (VDEX, 0, true),
            // Minor faults still extend the window: 10..=42, then 40..=72
            (VDEX, 10 * 4096, false),
            (VDEX, 40 * 4096, false),
            (ARM_LIB, 2 * 4096, true),
            (VDEX, 33 * 4096, false),
            // One past the last extended window
            (VDEX, 73 * 4096, true),
        ]
    );

    // Only files hit by faults are catalogued, not the whole inode table
    assert_eq!(
        sizes,
        [FileSizeRecord::whole_file(VDEX, 262_144), FileSizeRecord::whole_file(ARM_LIB, 16_384)]
    );
}

#[test]
fn test_larger_pages_scale_inode_offsets() {
    let capture = tempfile::tempdir().unwrap();
    stage_fixture(capture.path(), "inodes.txt", "inodes.txt");
    stage_fixture(capture.path(), "faults_inode.csv", "faults.csv");

    let device = FakeDevice::new("arm64-v8a");
    let config = ResolverConfig::new(16_384, 32).unwrap();
    resolve_capture(&device, capture.path(), CaptureMode::Inode, config, false).unwrap();

    let (faults, sizes) = load_mappings(capture.path()).unwrap();
    assert_eq!(faults[2].offset, 40 * 16_384);
    // Size queries failed for every file: logged, not fatal
    assert!(sizes.is_empty());
}

#[test]
fn test_empty_fault_log_writes_headers() {
    let capture = tempfile::tempdir().unwrap();
    stage_fixture(capture.path(), "maps.txt", "maps.txt");
    fs::write(
        capture.path().join("faults.csv"),
        "\"ts\",\"process_name\",\"thread_name\",\"address\",\"ip\"\n",
    )
    .unwrap();

    let device = FakeDevice::new("x86_64");
    let stats = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Address,
        ResolverConfig::default(),
        false,
    )
    .unwrap();
    assert_eq!(stats, ResolutionStats::default());

    let mapped = fs::read_to_string(capture.path().join("mapped_faults.csv")).unwrap();
    assert_eq!(
        mapped.trim_end(),
        "ts,process_name,thread_name,file_name,zip_entry_name,offset,is_major"
    );
}

#[test]
fn test_malformed_fault_log_is_fatal() {
    let capture = tempfile::tempdir().unwrap();
    stage_fixture(capture.path(), "inodes.txt", "inodes.txt");
    fs::write(
        capture.path().join("faults.csv"),
        "ts,process_name,thread_name,sdev,inode,index\n5000,com.example,main,64773,oops,0\n",
    )
    .unwrap();

    let device = FakeDevice::new("arm64-v8a");
    let err = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Inode,
        ResolverConfig::default(),
        false,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("faults.csv"), "got {err:#}");
    assert!(!capture.path().join("mapped_faults.csv").exists());
}

#[test]
fn test_missing_snapshot_is_fatal() {
    let capture = tempfile::tempdir().unwrap();
    stage_fixture(capture.path(), "faults_inode.csv", "faults.csv");

    let device = FakeDevice::new("arm64-v8a");
    let err = resolve_capture(
        &device,
        capture.path(),
        CaptureMode::Inode,
        ResolverConfig::default(),
        false,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("inodes.txt"), "got {err:#}");
}

#[test]
fn test_process_requires_collected_capture() {
    let capture = tempfile::tempdir().unwrap();
    let opts = ProcessOptions {
        package: "com.example".to_string(),
        output_dir: capture.path().to_path_buf(),
        pull_apks: false,
        trace_processor: PathBuf::from("trace_processor"),
        config: ResolverConfig::default(),
        mode: Some(CaptureMode::Address),
    };

    let err = run_process(&FakeDevice::new("x86_64"), &opts).unwrap_err();
    assert!(format!("{err:#}").contains("faultmap collect"), "got {err:#}");
}
