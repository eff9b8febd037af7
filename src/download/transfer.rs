//! Per-download unit of work: destination, byte accounting, lifecycle state.

use std::path::PathBuf;

use super::constants::TEMP_SUFFIX;

/// Lifecycle state of a [`Transfer`].
///
/// `Committed`, `Cancelled`, and `Failed` are terminal; a transfer is
/// created per download invocation and is not reusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Created but not yet handed to a worker.
    Created,
    /// Parked at the pre-streaming hold, waiting for a decision.
    AwaitingGate,
    /// The hold resolved to cancel; no filesystem writes were performed.
    Cancelled,
    /// Body bytes are being written to the temporary file.
    Streaming,
    /// The temporary file was renamed to the final name.
    Committed,
    /// Streaming or commit failed; see the returned error for the cause.
    Failed,
}

/// One download's unit of work.
///
/// Owned exclusively by the transfer's worker task: `bytes_written` and
/// `state` are mutated only there. The temporary file on disk is never
/// visible under the final name until the commit rename succeeds.
#[derive(Debug)]
pub struct Transfer {
    dest_dir: PathBuf,
    final_name: String,
    declared_length: Option<u64>,
    bytes_written: u64,
    state: TransferState,
}

impl Transfer {
    /// Creates a transfer targeting `{dest_dir}/{final_name}`.
    ///
    /// `declared_length` is the total byte count reported by the source,
    /// or `None` when the source did not declare one.
    #[must_use]
    pub fn new(
        dest_dir: impl Into<PathBuf>,
        final_name: impl Into<String>,
        declared_length: Option<u64>,
    ) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            final_name: final_name.into(),
            declared_length,
            bytes_written: 0,
            state: TransferState::Created,
        }
    }

    /// Destination directory for the final artifact.
    #[must_use]
    pub fn dest_dir(&self) -> &PathBuf {
        &self.dest_dir
    }

    /// Final file name within the destination directory.
    #[must_use]
    pub fn final_name(&self) -> &str {
        &self.final_name
    }

    /// Path of the committed artifact.
    #[must_use]
    pub fn final_path(&self) -> PathBuf {
        self.dest_dir.join(&self.final_name)
    }

    /// Path of the in-flight temporary file (final name + reserved suffix).
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}{TEMP_SUFFIX}", self.final_name))
    }

    /// Total byte count declared by the source, if known.
    #[must_use]
    pub fn declared_length(&self) -> Option<u64> {
        self.declared_length
    }

    /// Bytes written to the temporary file so far. Monotonically increasing.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    pub(crate) fn add_bytes_written(&mut self, bytes: u64) {
        self.bytes_written += bytes;
    }

    pub(crate) fn set_state(&mut self, state: TransferState) {
        self.state = state;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_temp_path_appends_reserved_suffix() {
        let transfer = Transfer::new("/tmp/dl", "a.bin", Some(10240));
        assert_eq!(transfer.final_path(), Path::new("/tmp/dl/a.bin"));
        assert_eq!(transfer.temp_path(), Path::new("/tmp/dl/a.bin.tmp"));
    }

    #[test]
    fn test_new_transfer_starts_created_with_zero_bytes() {
        let transfer = Transfer::new("/tmp/dl", "a.bin", None);
        assert_eq!(transfer.state(), TransferState::Created);
        assert_eq!(transfer.bytes_written(), 0);
        assert_eq!(transfer.declared_length(), None);
    }

    #[test]
    fn test_bytes_written_accumulates() {
        let mut transfer = Transfer::new("/tmp/dl", "a.bin", Some(3072));
        transfer.add_bytes_written(1024);
        transfer.add_bytes_written(2048);
        assert_eq!(transfer.bytes_written(), 3072);
    }
}
