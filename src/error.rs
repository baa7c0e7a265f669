//! Error types for exif-io

use std::io;

/// Result type for exif-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning JPEG sections or decoding Exif data
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input does not start with the start-of-image marker
    #[error("Not a JPEG: missing start-of-image marker")]
    NotAJpeg,

    /// A section declares more bytes than remain in the buffer
    #[error("Truncated section 0x{marker:02X} at offset {offset}: declared {declared} bytes, {remaining} remaining")]
    TruncatedSection {
        marker: u8,
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    /// Unrecognized byte order mark or magic in the TIFF header
    #[error("Bad TIFF header: {0}")]
    BadTiffHeader(String),

    /// Sub-directory offsets nest deeper than the configured ceiling
    #[error("Maximum directory nesting ({max}) exceeded at offset {offset}")]
    ExcessiveNesting { offset: usize, max: usize },

    /// An entry declares a number format outside the TIFF table
    #[error("Unsupported number format {format} for tag 0x{tag:04X}")]
    UnsupportedFormat { tag: u16, format: u16 },

    /// A read would run past the end of the buffer
    #[error("Read of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },

    /// Invalid segment
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: usize, reason: String },
}

impl Error {
    /// True for failures the Exif reader recovers from locally
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat { .. }
                | Error::ExcessiveNesting { .. }
                | Error::OutOfBounds { .. }
                | Error::InvalidSegment { .. }
        )
    }
}
