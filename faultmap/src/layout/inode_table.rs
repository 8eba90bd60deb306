//! Device-wide inode table for inode-mode resolution
//!
//! Page cache insertions only carry `(s_dev, i_ino, index)`, so the path of
//! every file is recovered from a `stat -c '%d %i %n'` dump taken right
//! after the capture.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::{InodeKey, ParseError};

/// (device, inode) → absolute path
#[derive(Debug, Default)]
pub struct InodeTable {
    paths: HashMap<InodeKey, String>,
}

impl InodeTable {
    /// Read and parse an inode dump from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or any line is malformed
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read inode table {}", path.display()))?;
        Ok(Self::parse(&text, &path.display().to_string())?)
    }

    /// Parse `<dev> <inode> <path>` lines. The path runs to the end of the
    /// line and may contain spaces. Blank lines are ignored.
    ///
    /// # Errors
    /// Returns a [`ParseError`] for the first line that does not conform
    pub fn parse(text: &str, source_name: &str) -> Result<Self, ParseError> {
        let mut paths = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, path) = parse_inode_line(line).ok_or_else(|| {
                ParseError::new(
                    source_name,
                    idx + 1,
                    format!("expected '<dev> <inode> <path>', got '{line}'"),
                )
            })?;
            paths.insert(key, path.to_string());
        }

        Ok(Self { paths })
    }

    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (InodeKey, S)>,
        S: Into<String>,
    {
        Self { paths: pairs.into_iter().map(|(k, v)| (k, v.into())).collect() }
    }

    /// Path recorded for `key`, if the inode existed when the table was dumped
    #[must_use]
    pub fn lookup(&self, key: InodeKey) -> Option<&str> {
        self.paths.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn parse_inode_line(line: &str) -> Option<(InodeKey, &str)> {
    let (dev, rest) = line.split_once(char::is_whitespace)?;
    let (inode, path) = rest.split_once(char::is_whitespace)?;
    let dev = dev.parse().ok()?;
    let inode = inode.parse().ok()?;
    if path.is_empty() {
        return None;
    }
    Some((InodeKey::new(dev, inode), path))
}
