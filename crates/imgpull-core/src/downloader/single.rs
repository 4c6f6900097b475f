//! Single-stream HTTP GET into the destination file.
//!
//! The destination is only opened once the final response carries a 2xx
//! status, so error responses never touch an existing file.

use super::{is_success, FetchError, FetchOptions, MAX_REDIRECTS};
use crate::storage::ImageWriter;
use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::str;
use std::thread;

/// Parses the status code out of a status line such as `HTTP/1.1 404 Not Found`.
/// Returns `None` for ordinary header lines.
fn status_from_header_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Shared between the curl header and write callbacks.
struct TransferState<'a> {
    dest: &'a Path,
    opts: &'a FetchOptions,
    /// Status of the most recent response (redirect hops overwrite it).
    status: Option<u32>,
    writer: Option<ImageWriter>,
    error: Option<FetchError>,
}

impl<'a> TransferState<'a> {
    fn new(dest: &'a Path, opts: &'a FetchOptions) -> Self {
        Self {
            dest,
            opts,
            status: None,
            writer: None,
            error: None,
        }
    }

    /// Returning false aborts the transfer.
    fn on_header(&mut self, line: &[u8]) -> bool {
        if let Some(code) = status_from_header_line(line) {
            self.status = Some(code);
            return true;
        }
        if !is_blank(line) {
            return true;
        }
        // End of a header block. Error statuses are final; don't download the body.
        match self.status {
            Some(code) if code >= 400 => {
                self.error = Some(FetchError::Http { code });
                false
            }
            _ => true,
        }
    }

    /// Sleeps the post-status delay, then creates or truncates the destination.
    fn create_writer(&self) -> Result<ImageWriter, FetchError> {
        thread::sleep(self.opts.delay);
        let writer =
            ImageWriter::create(self.dest).map_err(|source| storage_error(self.dest, source))?;
        tracing::trace!(path = %self.dest.display(), "opened destination");
        Ok(writer)
    }

    fn writer(&mut self) -> Result<&mut ImageWriter, FetchError> {
        let writer = match self.writer.take() {
            Some(w) => w,
            None => self.create_writer()?,
        };
        Ok(self.writer.insert(writer))
    }

    /// Returns the number of bytes consumed; anything short of `data.len()` aborts.
    fn on_body(&mut self, data: &[u8]) -> usize {
        // Bodies of redirect hops and other non-2xx responses are discarded.
        if !self.status.map_or(false, is_success) {
            return data.len();
        }
        let dest = self.dest;
        let res = self
            .writer()
            .and_then(|w| w.write_chunk(data).map_err(|source| storage_error(dest, source)));
        match res {
            Ok(()) => data.len(),
            Err(e) => {
                tracing::warn!("write failed: {}", e);
                self.error = Some(e);
                0
            }
        }
    }
}

fn storage_error(dest: &Path, source: io::Error) -> FetchError {
    FetchError::Storage {
        path: dest.to_path_buf(),
        source,
    }
}

/// Downloads `url` with one GET (redirects followed) and writes the body to `dest`.
/// Returns the number of bytes written.
///
/// `dest` is created or truncated only after a 2xx status. A failure while
/// streaming leaves the partial file in place.
pub fn fetch_to_path(url: &str, dest: &Path, opts: &FetchOptions) -> Result<u64, FetchError> {
    validate_url(url)?;

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTS)?;
    easy.useragent(concat!("imgpull/", env!("CARGO_PKG_VERSION")))?;
    easy.buffer_size(opts.chunk_size)?;
    easy.connect_timeout(opts.timeout)?;
    // Abort when the connection stalls for `timeout`; there is no cap on total transfer time.
    easy.low_speed_limit(1)?;
    easy.low_speed_time(opts.timeout)?;

    let state = RefCell::new(TransferState::new(dest, opts));
    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| state.borrow_mut().on_header(line))?;
        transfer.write_function(|data| Ok(state.borrow_mut().on_body(data)))?;
        transfer.perform()
    };

    let mut state = state.into_inner();
    if let Some(err) = state.error.take() {
        return Err(err);
    }
    performed?;

    let code = easy.response_code()?;
    if !is_success(code) {
        return Err(FetchError::Http { code });
    }

    // A 2xx with an empty body still produces an (empty) file.
    let writer = match state.writer.take() {
        Some(w) => w,
        None => state.create_writer()?,
    };
    writer.finish().map_err(|source| storage_error(dest, source))
}
