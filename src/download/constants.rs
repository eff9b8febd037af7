//! Constants for the download module (buffer sizing, temp-file naming).

/// Upper bound on a single streamed write (20 KiB).
///
/// Oversized body chunks are split to this size so progress notifications
/// keep per-write granularity regardless of how the transport batches reads.
pub const WRITE_CHUNK_BYTES: usize = 20 * 1024;

/// Suffix appended to the final file name while a transfer is in flight.
pub const TEMP_SUFFIX: &str = ".tmp";
