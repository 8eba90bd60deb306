//! Structured error types for faultmap
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Lookup misses and irrelevant files are not errors; see
//! [`crate::resolver::DropReason`].

use std::path::PathBuf;
use thiserror::Error;

/// A persisted record (snapshot line, table row, fault log row) is malformed.
#[derive(Error, Debug)]
#[error("{source_name}:{line}: {reason}")]
pub struct ParseError {
    /// File or table the record came from
    pub source_name: String,
    /// 1-based line (or row) number
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(source_name: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self { source_name: source_name.into(), line, reason: reason.into() }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a valid archive {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Command-line input that parsed but cannot be used
#[derive(Error, Debug)]
#[error("{0}")]
pub struct UsageError(pub String);

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed { command: String, status: String, stderr: String },

    #[error("Unexpected output from `{command}`: {output}")]
    UnexpectedOutput { command: String, output: String },

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CollaboratorError {
    /// True if the collaborator binary itself could not be found
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CollaboratorError::Launch { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("maps.txt", 12, "invalid hex in address range 'zz-10'");
        assert_eq!(err.to_string(), "maps.txt:12: invalid hex in address range 'zz-10'");
    }

    #[test]
    fn test_collaborator_failed_display() {
        let err = CollaboratorError::Failed {
            command: "adb pull /data/app/x/base.apk".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "remote object does not exist".to_string(),
        };
        assert!(err.to_string().contains("adb pull"));
        assert!(err.to_string().contains("does not exist"));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_launch_not_found_is_unavailable() {
        let err = CollaboratorError::Launch {
            program: "adb".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_unavailable());
    }
}
