/// Tickers resolved concurrently by one batch read. Upstream attempts are
/// bounded separately by the per-window call ceiling.
pub const BATCH_READ_CONCURRENCY: usize = 16;

/// Days of history requested by default.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;
