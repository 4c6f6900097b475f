//! Batch orchestration: every input row goes through naming, fetch and write.
//!
//! Per-record failures are reported and skipped; only failing to set up the
//! run (output dir, input file) or an I/O error on the input stops it.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::ImgpullConfig;
use crate::downloader::{self, FetchError, FetchOptions};
use crate::naming;
use crate::records::{Record, RowDecodeError, RowSource};

/// Index of the URL column.
pub const URL_FIELD: usize = 3;

/// Printed once the input is exhausted.
pub const COMPLETION_MESSAGE: &str = "Image download process complete.";

/// Cause of a row-level failure.
#[derive(Debug, thiserror::Error)]
pub enum RowFailure {
    #[error("row has no URL field (index 3)")]
    MissingUrl,
    #[error("could not decode row: {0}")]
    Decode(#[source] RowDecodeError),
    #[error(transparent)]
    Storage(FetchError),
}

/// A per-record failure. Never stops the batch.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Network, timeout, bad URL or non-2xx status.
    #[error("Error downloading image from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },
    /// Row shape, row decoding, or disk failure.
    #[error("Error processing row: {row}, Error: {reason}")]
    Row { row: String, reason: RowFailure },
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Downloaded,
    SkippedEmptyUrl,
}

/// Counters for the diagnostic log. Not printed to the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl BatchSummary {
    pub fn processed(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }
}

/// Runs one record through naming, fetch and write. Progress lines go to `out`.
pub fn process_record<W: Write>(
    record: &Record,
    output_dir: &Path,
    opts: &FetchOptions,
    out: &mut W,
) -> Result<std::result::Result<RecordOutcome, RecordError>> {
    let Some(url_field) = record.field(URL_FIELD) else {
        return Ok(Err(RecordError::Row {
            row: record.to_string(),
            reason: RowFailure::MissingUrl,
        }));
    };
    let url = url_field.trim();
    if url.is_empty() {
        tracing::debug!(line = record.line(), "empty URL, skipping");
        return Ok(Ok(RecordOutcome::SkippedEmptyUrl));
    }

    let path = naming::output_path(output_dir, record);
    writeln!(out, "Downloading image from: {} to {}", url, path.display())?;

    match downloader::fetch_to_path(url, &path, opts) {
        Ok(bytes) => {
            writeln!(out, "Downloaded {}", path.display())?;
            tracing::debug!(line = record.line(), bytes, path = %path.display(), "downloaded");
            Ok(Ok(RecordOutcome::Downloaded))
        }
        Err(e) if e.is_storage() => Ok(Err(RecordError::Row {
            row: record.to_string(),
            reason: RowFailure::Storage(e),
        })),
        Err(e) => {
            if e.is_timeout() {
                tracing::debug!(line = record.line(), url, "request timed out");
            }
            Ok(Err(RecordError::Download {
                url: url.to_string(),
                source: e,
            }))
        }
    }
}

/// Downloads every record listed in `cfg.input_path` into `cfg.output_dir`.
///
/// Console lines (header echo, per-record progress and errors, completion)
/// are written to `out`. Errors returned from here are fatal: the output
/// directory could not be created, the input could not be opened or read,
/// or `out` itself failed.
pub fn run_batch<W: Write>(
    cfg: &ImgpullConfig,
    opts: &FetchOptions,
    out: &mut W,
) -> Result<BatchSummary> {
    fs::create_dir_all(&cfg.output_dir).with_context(|| {
        format!("failed to create output directory: {}", cfg.output_dir.display())
    })?;

    let source = RowSource::open(&cfg.input_path)?;
    // A blank first line is still consumed as the header, but not echoed.
    if let Some(header) = source.header().filter(|h| !h.is_empty()) {
        writeln!(out, "Header row: {}", header)?;
    }

    let mut summary = BatchSummary::default();
    for row in source {
        let result = match row? {
            Ok(record) => process_record(&record, &cfg.output_dir, opts, out)?,
            Err(e) => Err(RecordError::Row {
                row: format!("<line {}>", e.line),
                reason: RowFailure::Decode(e),
            }),
        };
        match result {
            Ok(RecordOutcome::Downloaded) => summary.downloaded += 1,
            Ok(RecordOutcome::SkippedEmptyUrl) => summary.skipped += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!("{}", e);
                writeln!(out, "{}", e)?;
            }
        }
    }

    writeln!(out, "{}", COMPLETION_MESSAGE)?;
    tracing::info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}
