//! Streams a response body to a temporary file and commits it atomically.
//!
//! The writer is the transfer's single worker: it owns `bytes_written` and
//! `state`, consults the controller's gate exactly once before touching the
//! filesystem, and renames the fully written temp file to its final name so
//! a partial file is never observable under the final name.

use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use super::constants::WRITE_CHUNK_BYTES;
use super::controller::{DownloadController, GateDecision};
use super::error::TransferError;
use super::progress::{ProgressReporter, progress_fraction};
use super::transfer::{Transfer, TransferState};

/// Runs one transfer end to end and returns the committed final path.
///
/// Announces the declared length, consults the controller's gate, then
/// streams `body` to `{dest_dir}/{final_name}.tmp` in bounded writes with a
/// progress notification per write, and finally renames the temp file onto
/// the final name (replacing an existing file, last writer wins).
///
/// # Errors
///
/// - [`TransferError::Cancelled`]: the gate resolved to cancel; nothing was
///   written, not even the temp file.
/// - [`TransferError::CreateDir`]: the destination directory could not be
///   created.
/// - [`TransferError::Io`]: the body stream or a filesystem write failed;
///   the partial temp file is left in place.
/// - [`TransferError::Commit`]: replacing the existing final file or the
///   rename failed; the fully written temp file is left in place.
#[must_use = "the result carries the committed path or the terminal error"]
#[instrument(
    skip(transfer, body, reporter, controller),
    fields(final_name = %transfer.final_name())
)]
pub async fn save_file<S, E>(
    transfer: &mut Transfer,
    body: S,
    reporter: &ProgressReporter,
    controller: &DownloadController,
) -> Result<PathBuf, TransferError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let result = save_file_inner(transfer, body, reporter, controller).await;
    transfer.set_state(match &result {
        Ok(_) => TransferState::Committed,
        Err(TransferError::Cancelled) => TransferState::Cancelled,
        Err(_) => TransferState::Failed,
    });
    result
}

/// Inner implementation; the wrapper applies the terminal state transition.
async fn save_file_inner<S, E>(
    transfer: &mut Transfer,
    mut body: S,
    reporter: &ProgressReporter,
    controller: &DownloadController,
) -> Result<PathBuf, TransferError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    reporter.announce_length(transfer.declared_length());

    transfer.set_state(TransferState::AwaitingGate);
    if controller.await_decision().await == GateDecision::Cancel {
        debug!("gate resolved to cancel before any filesystem writes");
        return Err(TransferError::Cancelled);
    }
    transfer.set_state(TransferState::Streaming);

    fs::create_dir_all(transfer.dest_dir())
        .await
        .map_err(|e| TransferError::create_dir(transfer.dest_dir(), e))?;

    let temp_path = transfer.temp_path();
    let final_path = transfer.final_path();

    // Truncates a stale temp file left by a prior failed run.
    let file = File::create(&temp_path)
        .await
        .map_err(|e| TransferError::io(temp_path.clone(), e))?;
    let mut writer = BufWriter::new(file);

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result.map_err(|e| TransferError::io(temp_path.clone(), e))?;

        // Oversized network chunks are split so each write stays bounded
        // and produces exactly one progress notification.
        for piece in chunk.chunks(WRITE_CHUNK_BYTES) {
            writer
                .write_all(piece)
                .await
                .map_err(|e| TransferError::io(temp_path.clone(), e))?;
            transfer.add_bytes_written(piece.len() as u64);
            reporter.announce_progress(progress_fraction(
                transfer.bytes_written(),
                transfer.declared_length(),
            ));
        }
    }

    // Ensure all data reaches the file before the rename.
    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(temp_path.clone(), e))?;
    drop(writer);

    // Last writer wins: an existing final file is removed before the rename.
    match fs::remove_file(&final_path).await {
        Ok(()) => debug!(path = %final_path.display(), "removed existing final file"),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            return Err(TransferError::commit(temp_path, final_path, error));
        }
    }

    if let Err(error) = fs::rename(&temp_path, &final_path).await {
        // The temp file is retained for diagnosis.
        return Err(TransferError::commit(temp_path, final_path, error));
    }

    info!(
        path = %final_path.display(),
        bytes = transfer.bytes_written(),
        "transfer committed"
    );

    Ok(final_path)
}
