//! Row source: streams records from the input CSV file.
//!
//! The first row is always consumed as a header, whatever it contains.
//! Rows may be ragged; consumers decide what a short row means. A blank
//! line is a row with no fields, not something to skip.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One parsed input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
    line: u64,
}

impl Record {
    pub fn new(fields: Vec<String>, line: u64) -> Self {
        Self { fields, line }
    }

    /// Field at `index`, or `None` when the row is shorter than that.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// True for a blank input line.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 1-based line the row starts on.
    pub fn line(&self) -> u64 {
        self.line
    }
}

/// Writes `s` single-quoted, switching to double quotes when `s` holds a
/// single quote but no double quote. Backslashes, the active quote and
/// control characters are escaped.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if (c as u32) < 0x20 || c == '\x7f' => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Renders as a bracketed list of quoted fields: `['A1', 'V1']`.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, field)?;
        }
        f.write_char(']')
    }
}

/// Error for a single row that could not be decoded. The reader has already
/// moved past it, so the caller can keep iterating.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct RowDecodeError {
    pub line: u64,
    #[source]
    pub source: csv::Error,
}

/// Quote tracking used to find where a row ends. A newline inside a quoted
/// field continues the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// Saw `"` inside a quoted field: either an escaped quote or the close.
    QuoteInQuoted,
}

impl QuoteState {
    fn step(self, b: u8) -> Self {
        use QuoteState::*;
        match (self, b) {
            (Quoted, b'"') => QuoteInQuoted,
            (Quoted, _) => Quoted,
            (FieldStart, b'"') | (QuoteInQuoted, b'"') => Quoted,
            (_, b',') | (_, b'\n') => FieldStart,
            _ => Unquoted,
        }
    }
}

/// Reads the raw bytes of the next row into `buf`. Returns the number of
/// physical lines consumed; 0 means end of input.
fn read_row_bytes<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<u64> {
    buf.clear();
    let mut lines = 0;
    let mut state = QuoteState::FieldStart;
    loop {
        let start = buf.len();
        if reader.read_until(b'\n', buf)? == 0 {
            return Ok(lines);
        }
        lines += 1;
        state = buf[start..].iter().fold(state, |s, &b| s.step(b));
        if state != QuoteState::Quoted {
            return Ok(lines);
        }
    }
}

fn is_blank_line(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == b'\n' || b == b'\r')
}

/// Lazy, forward-only sequence of records following the header row.
pub struct RowSource {
    header: Option<Record>,
    reader: BufReader<File>,
    parser: ReaderBuilder,
    buf: Vec<u8>,
    next_line: u64,
}

impl RowSource {
    /// Opens `path` and consumes its first row as header.
    ///
    /// Failing to open or read the file is fatal for the whole run.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open input file: {}", path.display()))?;
        let mut parser = ReaderBuilder::new();
        parser.has_headers(false).flexible(true);
        let mut source = Self {
            header: None,
            reader: BufReader::new(file),
            parser,
            buf: Vec::new(),
            next_line: 1,
        };
        source.header = match source
            .read_row()
            .with_context(|| format!("failed to read {}", path.display()))?
        {
            Some(Ok(record)) => Some(record),
            // An undecodable header is still consumed.
            Some(Err(e)) => {
                tracing::warn!("header row could not be decoded: {}", e);
                None
            }
            None => None,
        };
        Ok(source)
    }

    /// The consumed first row, if the file had one. Empty when the file
    /// starts with a blank line.
    pub fn header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    fn read_row(&mut self) -> Result<Option<std::result::Result<Record, RowDecodeError>>> {
        let lines = read_row_bytes(&mut self.reader, &mut self.buf)
            .context("failed to read input row")?;
        if lines == 0 {
            return Ok(None);
        }
        let line = self.next_line;
        self.next_line += lines;

        if is_blank_line(&self.buf) {
            return Ok(Some(Ok(Record::new(Vec::new(), line))));
        }
        let mut csv_row = StringRecord::new();
        let parsed = self
            .parser
            .from_reader(self.buf.as_slice())
            .read_record(&mut csv_row);
        Ok(Some(match parsed {
            Ok(_) => Ok(Record::new(csv_row.iter().map(str::to_string).collect(), line)),
            Err(source) => Err(RowDecodeError { line, source }),
        }))
    }
}

impl Iterator for RowSource {
    /// Outer error: I/O failure, fatal. Inner error: one bad row.
    type Item = Result<std::result::Result<Record, RowDecodeError>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().transpose()
    }
}
