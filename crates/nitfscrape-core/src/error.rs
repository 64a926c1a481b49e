//! Error types for the nitfscrape-core library.
//!
//! This module provides error handling using the `thiserror` crate. The
//! decode-side variants mirror the ways a header can fail to parse; the
//! encode-side variants are caller errors raised by builders and the
//! field codec.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nitfscrape operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all nitfscrape operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on a caller-supplied stream
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The leading magic/version marker did not match
    #[error("not a NITF 2.1 file: found leading bytes {found:?}")]
    NotThisFormat {
        /// The bytes that were found, lossily decoded
        found: String,
    },

    /// A buffer or stream ended before a record or field was complete
    #[error("truncated input while reading {what} at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedInput {
        /// Record or field being read
        what: &'static str,
        /// Byte offset where the read started
        offset: usize,
        /// Number of bytes required
        needed: usize,
        /// Number of bytes remaining
        available: usize,
    },

    /// A field holds bytes that cannot be interpreted
    #[error("malformed field {field} at offset {offset}: {details}")]
    MalformedField {
        /// Field mnemonic
        field: &'static str,
        /// Byte offset of the field
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A text value is longer than its field
    #[error("value for {field} is {actual} bytes, field width is {width}")]
    ValueTooLong {
        /// Field mnemonic
        field: &'static str,
        /// Field width in bytes
        width: usize,
        /// Length of the rejected value
        actual: usize,
    },

    /// An integer does not fit in its field's decimal digits
    #[error("value {value} for {field} does not fit in {width} decimal digits")]
    ValueOutOfRange {
        /// Field mnemonic
        field: &'static str,
        /// Field width in digits
        width: usize,
        /// The rejected value
        value: u64,
    },

    /// A raw-bytes value does not match its field width exactly
    #[error("raw value for {field} must be exactly {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Field mnemonic
        field: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A constructor rejected a structurally invalid value
    #[error("invalid value for {field}: {details}")]
    InvalidValue {
        /// Field or record name
        field: &'static str,
        /// Detailed description of the issue
        details: String,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new format mismatch error from the bytes actually found
    pub fn not_this_format(found: &[u8]) -> Self {
        Self::NotThisFormat {
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    /// Creates a new truncation error
    pub fn truncated(what: &'static str, offset: usize, needed: usize, available: usize) -> Self {
        Self::TruncatedInput {
            what,
            offset,
            needed,
            available,
        }
    }

    /// Creates a new malformed field error
    pub fn malformed(field: &'static str, offset: usize, details: impl Into<String>) -> Self {
        Self::MalformedField {
            field,
            offset,
            details: details.into(),
        }
    }

    /// Creates a new invalid value error
    pub fn invalid_value(field: &'static str, details: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            details: details.into(),
        }
    }

    /// Maps a stream error, turning a short read into [`Error::TruncatedInput`]
    pub(crate) fn from_read(
        source: std::io::Error,
        what: &'static str,
        offset: u64,
        needed: usize,
    ) -> Self {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::truncated(what, offset as usize, needed, 0)
        } else {
            Self::Io(source)
        }
    }

    /// Returns true if the caller should move on and try another format
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotThisFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::truncated("SecurityTags", 12, 167, 40);
        let text = err.to_string();
        assert!(text.contains("SecurityTags"));
        assert!(text.contains("need 167"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::not_this_format(b"GIF89a").is_recoverable());
        assert!(!Error::malformed("HL", 354, "not digits").is_recoverable());
        assert!(!Error::truncated("FileHeader", 0, 388, 10).is_recoverable());
    }

    #[test]
    fn test_short_read_maps_to_truncation() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            Error::from_read(eof, "magic", 0, 9),
            Error::TruncatedInput { needed: 9, .. }
        ));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(Error::from_read(denied, "magic", 0, 9), Error::Io(_)));
    }
}
