//! Per-transfer worker tasks and the HTTP response adapter.
//!
//! Each transfer runs on its own spawned tokio task, which performs the
//! whole of [`save_file`] synchronously from its own point of view and may
//! block at the gate. The terminal outcome is posted through the reporter so
//! the observer receives exactly one result, ordered after all progress.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::controller::DownloadController;
use super::progress::{ProgressReporter, TransferObserver};
use super::transfer::Transfer;
use super::writer::save_file;
use crate::dispatch::Dispatcher;

/// Caller-side handle to a spawned transfer.
///
/// Wraps the transfer's controller for gate decisions and the worker's join
/// handle. The transfer outcome itself is delivered to the observer through
/// the dispatcher, not through this handle.
#[derive(Debug)]
pub struct TransferHandle {
    controller: Arc<DownloadController>,
    worker: JoinHandle<()>,
}

impl TransferHandle {
    /// Releases a transfer parked at the gate. No-op once it has proceeded.
    pub fn resume(&self) {
        self.controller.resume();
    }

    /// Cancels a transfer at the gate. Effective only before streaming
    /// begins; a transfer that is already streaming runs to completion or
    /// to a stream error.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// The controller shared with the worker.
    #[must_use]
    pub fn controller(&self) -> &Arc<DownloadController> {
        &self.controller
    }

    /// Waits for the worker task to finish.
    ///
    /// The outcome was already posted to the observer; a join error here
    /// means the worker panicked or was aborted, which is logged rather
    /// than propagated.
    pub async fn join(self) {
        if let Err(error) = self.worker.await {
            warn!(error = %error, "transfer worker did not run to completion");
        }
    }
}

/// Spawns one worker task that runs `transfer` to its terminal outcome.
///
/// The controller must be fully configured (see
/// [`DownloadController::set_hold`]) before this call; the worker may reach
/// the gate immediately. The outcome is posted through the dispatcher as the
/// observer's `on_result`, after every progress notification.
#[instrument(
    skip(transfer, body, controller, observer, dispatcher),
    fields(final_name = %transfer.final_name())
)]
pub fn spawn_transfer<S, E>(
    mut transfer: Transfer,
    body: S,
    controller: Arc<DownloadController>,
    observer: Arc<dyn TransferObserver>,
    dispatcher: Arc<dyn Dispatcher>,
) -> TransferHandle
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let reporter = ProgressReporter::new(observer, dispatcher);
    let worker = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let result = save_file(&mut transfer, body, &reporter, &controller).await;
            match &result {
                Ok(path) => info!(path = %path.display(), "transfer finished"),
                Err(error) => warn!(error = %error, "transfer failed"),
            }
            reporter.announce_result(result);
        })
    };

    TransferHandle { controller, worker }
}

/// Spawns a transfer consuming a [`reqwest::Response`].
///
/// Reads the declared length from the response metadata and streams its
/// body; everything else behaves as [`spawn_transfer`]. Aborting the
/// underlying HTTP call surfaces to the worker as a stream error, not as a
/// cancellation.
pub fn spawn_from_response(
    response: reqwest::Response,
    dest_dir: impl Into<PathBuf>,
    final_name: impl Into<String>,
    controller: Arc<DownloadController>,
    observer: Arc<dyn TransferObserver>,
    dispatcher: Arc<dyn Dispatcher>,
) -> TransferHandle {
    let declared_length = response.content_length();
    let transfer = Transfer::new(dest_dir, final_name, declared_length);
    let body = response.bytes_stream().boxed();
    spawn_transfer(transfer, body, controller, observer, dispatcher)
}
