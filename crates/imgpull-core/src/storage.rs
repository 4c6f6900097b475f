//! Disk output for fetched images.
//!
//! The destination is opened with truncation and written in place, chunk by
//! chunk. There is no temp file and no rename: a failure mid-stream leaves
//! whatever was already written at the final path.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Upper bound on the size of one write, and the receive buffer size
/// requested from the HTTP client.
pub const CHUNK_SIZE: usize = 8192;

/// Sequential writer for one output file.
#[derive(Debug)]
pub struct ImageWriter {
    file: File,
    written: u64,
}

impl ImageWriter {
    /// Create `path`, truncating any existing content.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file, written: 0 })
    }

    /// Append `data`, split into writes of at most [`CHUNK_SIZE`] bytes.
    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        for chunk in data.chunks(CHUNK_SIZE) {
            self.file.write_all(chunk)?;
            self.written += chunk.len() as u64;
        }
        Ok(())
    }

    /// Flush and close the file. Returns the number of bytes written.
    pub fn finish(mut self) -> io::Result<u64> {
        self.file.flush()?;
        Ok(self.written)
    }
}
