//! Row types of the persisted CSV files.

use serde::{Deserialize, Serialize};

/// One resolved fault, as written to `mapped_faults.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedFaultRecord {
    pub ts: u64,
    pub process_name: String,
    pub thread_name: String,
    pub file_name: String,
    pub zip_entry_name: Option<String>,
    /// Byte offset within `file_name` (not within the archive entry)
    pub offset: u64,
    #[serde(with = "bool_literal")]
    pub is_major: bool,
}

/// Size of a file or of one archive entry, as written to `file_sizes.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSizeRecord {
    pub file_name: String,
    pub zip_entry_name: Option<String>,
    pub size: u64,
    /// Offset of the entry's header within the archive, 0 for whole files
    pub file_offset: u64,
}

impl FileSizeRecord {
    /// Record for a whole file.
    #[must_use]
    pub fn whole_file(file_name: impl Into<String>, size: u64) -> Self {
        Self { file_name: file_name.into(), zip_entry_name: None, size, file_offset: 0 }
    }

    /// True if this record describes `file_name` / `zip_entry_name`.
    #[must_use]
    pub fn matches(&self, file_name: &str, zip_entry_name: Option<&str>) -> bool {
        self.file_name == file_name && self.zip_entry_name.as_deref() == zip_entry_name
    }
}

/// `True` / `False` literals, accepting lowercase on input.
mod bool_literal {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "True" | "true" | "1" => Ok(true),
            "False" | "false" | "0" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean literal '{other}'"))),
        }
    }
}
