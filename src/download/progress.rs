//! Observer notifications for one transfer, posted through a dispatcher.
//!
//! The reporter performs no I/O and holds no transfer state; it formats a
//! byte count into a fraction and hands each notification to the injected
//! [`Dispatcher`] so observer code never runs on the worker task.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;

use super::error::TransferError;
use crate::dispatch::Dispatcher;

/// Receives transfer notifications on the dispatcher's consumer context.
///
/// Implementations must be cheap to call; long-running work belongs on the
/// consumer side of the dispatcher, not in these methods.
pub trait TransferObserver: Send + Sync {
    /// Total byte count declared by the source, or `None` when unknown.
    ///
    /// Delivered exactly once per transfer, before any progress.
    fn on_length(&self, declared_length: Option<u64>) {
        let _ = declared_length;
    }

    /// Fraction of the declared length written so far, in `[0, 1]`.
    ///
    /// Delivered once per bounded write, in write order; non-decreasing for
    /// a given transfer. A constant `0.0` is reported when the declared
    /// length is unknown or zero.
    fn on_progress(&self, fraction: f32);

    /// Terminal outcome of the transfer: the committed final path, or the
    /// single error that ended it. Delivered exactly once, after all
    /// progress notifications.
    fn on_result(&self, result: Result<PathBuf, TransferError>);
}

/// Posts length, progress, and result notifications for one transfer.
pub struct ProgressReporter {
    observer: Arc<dyn TransferObserver>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl ProgressReporter {
    /// Creates a reporter delivering to `observer` via `dispatcher`.
    #[must_use]
    pub fn new(observer: Arc<dyn TransferObserver>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            observer,
            dispatcher,
        }
    }

    /// Posts the declared content length.
    pub fn announce_length(&self, declared_length: Option<u64>) {
        trace!(?declared_length, "posting content length");
        let observer = Arc::clone(&self.observer);
        self.dispatcher
            .post(Box::new(move || observer.on_length(declared_length)));
    }

    /// Posts one progress fraction.
    pub fn announce_progress(&self, fraction: f32) {
        trace!(fraction, "posting progress");
        let observer = Arc::clone(&self.observer);
        self.dispatcher
            .post(Box::new(move || observer.on_progress(fraction)));
    }

    /// Posts the terminal outcome.
    pub fn announce_result(&self, result: Result<PathBuf, TransferError>) {
        trace!(ok = result.is_ok(), "posting result");
        let observer = Arc::clone(&self.observer);
        self.dispatcher
            .post(Box::new(move || observer.on_result(result)));
    }
}

/// Computes the progress fraction for `bytes_written` of `declared_length`.
///
/// Clamped to `1.0` should the source deliver more bytes than it declared.
/// An unknown or zero declared length degrades to a constant `0.0` so the
/// sequence stays non-decreasing without a divide by zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn progress_fraction(bytes_written: u64, declared_length: Option<u64>) -> f32 {
    match declared_length {
        Some(total) if total > 0 => {
            let fraction = bytes_written as f64 / total as f64;
            fraction.min(1.0) as f32
        }
        _ => 0.0,
    }
}
