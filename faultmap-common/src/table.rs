//! CSV sinks and sources for the persisted records.
//!
//! Headers are written explicitly so that an empty run still produces a
//! file with a header row.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::records::{FileSizeRecord, MappedFaultRecord};
use crate::{FILE_SIZES_FILE, MAPPED_FAULTS_FILE};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row in {table}: {source}")]
    Row {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write {table}: {source}")]
    Write {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A record type with a fixed column layout.
pub trait TableRecord: Serialize {
    const HEADERS: &'static [&'static str];
}

impl TableRecord for MappedFaultRecord {
    const HEADERS: &'static [&'static str] = &[
        "ts",
        "process_name",
        "thread_name",
        "file_name",
        "zip_entry_name",
        "offset",
        "is_major",
    ];
}

impl TableRecord for FileSizeRecord {
    const HEADERS: &'static [&'static str] =
        &["file_name", "zip_entry_name", "size", "file_offset"];
}

/// Streaming CSV writer for one table.
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
    table: String,
    rows: usize,
}

impl TableWriter<BufWriter<File>> {
    /// Create (truncating) `path` and write the header row for `T`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or the header cannot be written
    pub fn create<T: TableRecord>(path: &Path) -> Result<Self, TableError> {
        let file = File::create(path)
            .map_err(|source| TableError::Open { path: path.to_path_buf(), source })?;
        Self::new::<T>(BufWriter::new(file), path.display().to_string())
    }
}

impl<W: Write> TableWriter<W> {
    /// Wrap `writer` and write the header row for `T`.
    ///
    /// # Errors
    /// Returns an error if the header cannot be written
    pub fn new<T: TableRecord>(writer: W, table: impl Into<String>) -> Result<Self, TableError> {
        let table = table.into();
        let mut inner = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        inner
            .write_record(T::HEADERS)
            .map_err(|source| TableError::Write { table: table.clone(), source })?;
        Ok(Self { inner, table, rows: 0 })
    }

    /// Append one row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be serialized or written
    pub fn write<T: TableRecord>(&mut self, record: &T) -> Result<(), TableError> {
        self.inner
            .serialize(record)
            .map_err(|source| TableError::Write { table: self.table.clone(), source })?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far (header excluded)
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails
    pub fn finish(self) -> Result<W, TableError> {
        self.inner.into_inner().map_err(|e| TableError::Io(e.into_error()))
    }
}

/// Read every row of a headered CSV table.
///
/// # Errors
/// Returns [`TableError::Row`] on the first row that does not deserialize into `T`
pub fn read_records<T: DeserializeOwned, R: Read>(
    reader: R,
    table: &str,
) -> Result<Vec<T>, TableError> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| TableError::Row { table: table.to_string(), source })
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TableError> {
    let file =
        File::open(path).map_err(|source| TableError::Open { path: path.to_path_buf(), source })?;
    read_records(file, &path.display().to_string())
}

/// Load `mapped_faults.csv` and `file_sizes.csv` from an output directory.
///
/// # Errors
/// Returns an error if either file is missing or malformed
pub fn load_mappings(
    output_dir: &Path,
) -> Result<(Vec<MappedFaultRecord>, Vec<FileSizeRecord>), TableError> {
    let faults = read_table(&output_dir.join(MAPPED_FAULTS_FILE))?;
    let sizes = read_table(&output_dir.join(FILE_SIZES_FILE))?;
    Ok((faults, sizes))
}
