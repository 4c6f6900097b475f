//! Output filename derivation.
//!
//! A record's image is saved as `<field0>-<field1>.jpg`. Missing identity
//! fields are replaced by a sentinel instead of failing the row.

use crate::records::Record;
use std::path::{Path, PathBuf};

/// Substituted when the row has no field 0.
pub const COL1_MISSING: &str = "col1_missing";

/// Substituted when the row has no field 1.
pub const COL2_MISSING: &str = "col2_missing";

/// Extension of every output file. The payload is not inspected.
pub const IMAGE_EXTENSION: &str = "jpg";

/// The `(field0, field1)` pair a filename is built from, whitespace-trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPair<'a> {
    pub first: &'a str,
    pub second: &'a str,
}

impl<'a> IdentityPair<'a> {
    pub fn from_record(record: &'a Record) -> Self {
        Self {
            first: record.field(0).map(str::trim).unwrap_or(COL1_MISSING),
            second: record.field(1).map(str::trim).unwrap_or(COL2_MISSING),
        }
    }
}

/// Derives the bare filename for `record`.
///
/// # Examples
///
/// - `["A1", "V1", "0", "http://…"]` → `"A1-V1.jpg"`
/// - `[" A1 ", "V1 "]` → `"A1-V1.jpg"`
/// - `["A1"]` → `"A1-col2_missing.jpg"`
pub fn derive_filename(record: &Record) -> String {
    let id = IdentityPair::from_record(record);
    format!("{}-{}.{}", id.first, id.second, IMAGE_EXTENSION)
}

/// Full destination path of `record`'s image inside `output_dir`.
pub fn output_path(output_dir: &Path, record: &Record) -> PathBuf {
    output_dir.join(derive_filename(record))
}
