//! Constants for the download module (timeouts, buffering).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large rasters).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Write buffer size used when streaming a tile to disk (512 KiB).
pub const CHUNK_SIZE: usize = 512 * 1024;

/// Suffix of the temporary file a tile is streamed into before it is renamed.
pub const PARTIAL_SUFFIX: &str = ".part";
