//! Streaming file downloads with a pre-stream gate and atomic commit.
//!
//! One [`Transfer`] streams one response body to
//! `{dest_dir}/{final_name}.tmp`, reporting progress through an injected
//! [`Dispatcher`](crate::dispatch::Dispatcher), and renames the temp file to
//! its final name only after the body is fully written.
//!
//! # Features
//!
//! - Streaming writes in bounded chunks (memory-efficient for large files)
//! - Optional suspend-before-streaming gate with resume/cancel
//! - Observer notifications delivered off the worker task, in write order
//! - Atomic rename commit: a partial file is never visible under the final name
//! - Structured error types with full path context
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use fetcher_core::dispatch::ChannelDispatcher;
//! use fetcher_core::download::{
//!     DownloadController, TransferError, TransferObserver, spawn_from_response,
//! };
//!
//! struct LogObserver;
//!
//! impl TransferObserver for LogObserver {
//!     fn on_progress(&self, fraction: f32) {
//!         println!("progress: {:.0}%", fraction * 100.0);
//!     }
//!
//!     fn on_result(&self, result: Result<PathBuf, TransferError>) {
//!         println!("finished: {result:?}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let response = reqwest::get("https://example.com/paper.pdf").await?;
//! let controller = Arc::new(DownloadController::new());
//! let handle = spawn_from_response(
//!     response,
//!     "./downloads",
//!     "paper.pdf",
//!     Arc::clone(&controller),
//!     Arc::new(LogObserver),
//!     Arc::new(ChannelDispatcher::spawn()),
//! );
//! handle.join().await;
//! # Ok(())
//! # }
//! ```

mod constants;
mod controller;
mod engine;
mod error;
mod progress;
mod transfer;
mod writer;

pub use constants::{TEMP_SUFFIX, WRITE_CHUNK_BYTES};
pub use controller::{DownloadController, GateDecision};
pub use engine::{TransferHandle, spawn_from_response, spawn_transfer};
pub use error::TransferError;
pub use progress::{ProgressReporter, TransferObserver, progress_fraction};
pub use transfer::{Transfer, TransferState};
pub use writer::save_file;
