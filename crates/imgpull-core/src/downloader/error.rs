//! Fetch error type.

use std::io;
use std::path::PathBuf;

/// Why a single record's fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Not an absolute http(s) URL; no request was sent.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Curl reported an error (timeout, connection, DNS, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Final response had a non-2xx status.
    #[error("HTTP status {code}")]
    Http { code: u32 },
    /// Creating or writing the destination file failed.
    #[error("failed to write {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Disk-side failures, as opposed to anything the remote end did.
    pub fn is_storage(&self) -> bool {
        matches!(self, FetchError::Storage { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Curl(e) if e.is_operation_timedout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message() {
        assert_eq!(FetchError::Http { code: 404 }.to_string(), "HTTP status 404");
    }

    #[test]
    fn storage_error_message_names_path() {
        let e = FetchError::Storage {
            path: PathBuf::from("out/A1-V1.jpg"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.is_storage());
        assert_eq!(e.to_string(), "failed to write out/A1-V1.jpg: denied");
    }

    #[test]
    fn remote_errors_are_not_storage() {
        assert!(!FetchError::Http { code: 500 }.is_storage());
        let invalid = FetchError::InvalidUrl {
            url: "nope".into(),
            reason: "relative URL without a base".into(),
        };
        assert!(!invalid.is_storage());
        assert!(!invalid.is_timeout());
    }
}
