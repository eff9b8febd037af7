//! Error types for the download module.
//!
//! Every error is terminal for its transfer and is surfaced exactly once to
//! the observer; nothing is retried internally.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed source for streaming failures: both transport errors and
/// `std::io::Error` flow through the same variant.
type StreamSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during a file transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The pre-streaming hold resolved to cancel. No filesystem writes
    /// were performed, not even temp-file creation.
    #[error("download cancelled by user")]
    Cancelled,

    /// Read or write failure while streaming the body to the temporary
    /// file. The partially written temp file is left in place.
    #[error("transfer failed while streaming to {path}: {source}")]
    Io {
        /// The temporary file being written when the failure occurred.
        path: PathBuf,
        /// The underlying stream or filesystem error.
        #[source]
        source: StreamSource,
    },

    /// Replacing the final file or renaming the temp file failed after the
    /// body was fully written. The temp file is retained for diagnosis.
    #[error("failed to commit {temp_path} as {final_path}: {source}")]
    Commit {
        /// The fully written temporary file.
        temp_path: PathBuf,
        /// The final path the rename targeted.
        final_path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be created.
    #[error("failed to create destination directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Creates a streaming IO error with temp-path context.
    pub fn io(path: impl Into<PathBuf>, source: impl Into<StreamSource>) -> Self {
        Self::Io {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a commit error with both path contexts.
    pub fn commit(
        temp_path: impl Into<PathBuf>,
        final_path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Commit {
            temp_path: temp_path.into(),
            final_path: final_path.into(),
            source,
        }
    }

    /// Creates a directory-creation error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }
}

// No blanket `From<std::io::Error>` impl: the variants require path context
// the source error does not carry, so construction goes through the helpers.
