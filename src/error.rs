//! Error types for aspectfix.

use std::io;
use std::path::{Path, PathBuf};

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fixing sequence headers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested ratio is not one a header can carry.
    #[error("unknown ratio '{0}' (expected 1:1, 4:3 or 16:9)")]
    UnknownRatio(String),

    /// The file name pattern is not a valid regular expression.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Opening, reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An entry below a walked directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl Error {
    /// Create an I/O error tied to a path.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// File or directory entry the error is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Walk { path, .. } => Some(path.as_path()),
            Self::UnknownRatio(_) | Self::InvalidPattern { .. } => None,
        }
    }

    /// Whether this error invalidates the whole run rather than a single file.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownRatio(_) | Self::InvalidPattern { .. })
    }
}
