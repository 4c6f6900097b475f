//! HTTP fetcher: one blocking GET per record, body streamed to disk.
//!
//! Timeout, post-status delay and chunk size are fixed constants. Nothing
//! here retries; the caller decides what a failure means for the batch.

mod error;
mod single;

use std::time::Duration;

pub use error::FetchError;
pub use single::fetch_to_path;

/// Connect timeout and stalled-read timeout for one request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a success status, before the body is written.
pub const POST_STATUS_DELAY: Duration = Duration::from_millis(100);

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: u32 = 30;

/// Knobs for a single fetch. Only the defaults are used outside tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub delay: Duration,
    pub chunk_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: FETCH_TIMEOUT,
            delay: POST_STATUS_DELAY,
            chunk_size: crate::storage::CHUNK_SIZE,
        }
    }
}

/// 2xx only. Redirects are followed before this is checked, so a final 3xx
/// is a failure too.
pub fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}
