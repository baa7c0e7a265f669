//! Reader and writer configuration

use crate::byte_codec::Endian;

/// Default sub-directory nesting ceiling
pub const DEFAULT_MAX_NESTING: usize = 4;

/// Default number of date/time occurrences kept
pub const DEFAULT_MAX_DATE_COPIES: usize = 10;

/// Maximum number of tags in an IFD (prevents DOS attacks)
pub const DEFAULT_MAX_DIRECTORY_ENTRIES: usize = 1000;

/// Options controlling Exif decoding
///
/// # Example
///
/// ```
/// use exif_io::ReadOptions;
///
/// let options = ReadOptions::new()
///     .with_max_nesting(2)
///     .with_maker_notes(false);
/// assert_eq!(options.max_nesting, 2);
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Deepest sub-directory level followed; deeper offsets fail that branch
    pub max_nesting: usize,

    /// Date/time occurrences kept across all directories; extras are dropped
    pub max_date_copies: usize,

    /// Directories claiming more entries than this are rejected
    pub max_directory_entries: usize,

    /// Decode vendor maker notes (the raw blob is kept either way)
    pub decode_maker_notes: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_nesting: DEFAULT_MAX_NESTING,
            max_date_copies: DEFAULT_MAX_DATE_COPIES,
            max_directory_entries: DEFAULT_MAX_DIRECTORY_ENTRIES,
            decode_maker_notes: true,
        }
    }
}

impl ReadOptions {
    /// Create options with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting(mut self, depth: usize) -> Self {
        self.max_nesting = depth;
        self
    }

    pub fn with_max_date_copies(mut self, copies: usize) -> Self {
        self.max_date_copies = copies;
        self
    }

    pub fn with_max_directory_entries(mut self, entries: usize) -> Self {
        self.max_directory_entries = entries;
        self
    }

    pub fn with_maker_notes(mut self, decode: bool) -> Self {
        self.decode_maker_notes = decode;
        self
    }
}

/// Options controlling Exif encoding
///
/// # Example
///
/// ```
/// use exif_io::{Endian, WriteOptions};
///
/// let options = WriteOptions::new()
///     .with_byte_order(Endian::Little)
///     .without_thumbnail();
/// assert!(!options.include_thumbnail);
/// ```
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Byte order of the whole block
    pub byte_order: Endian,

    /// Emit IFD1 with the embedded thumbnail when the record has one
    pub include_thumbnail: bool,

    /// Emit entries no field claimed when they were read
    pub include_unknown_entries: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            byte_order: Endian::Big,
            include_thumbnail: true,
            include_unknown_entries: true,
        }
    }
}

impl WriteOptions {
    /// Create options with the defaults (big endian, everything included)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_order(mut self, order: Endian) -> Self {
        self.byte_order = order;
        self
    }

    pub fn without_thumbnail(mut self) -> Self {
        self.include_thumbnail = false;
        self
    }

    pub fn without_unknown_entries(mut self) -> Self {
        self.include_unknown_entries = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_defaults() {
        let options = ReadOptions::default();
        assert_eq!(options.max_nesting, 4);
        assert_eq!(options.max_date_copies, 10);
        assert_eq!(options.max_directory_entries, 1000);
        assert!(options.decode_maker_notes);
    }

    #[test]
    fn test_write_builder() {
        let options = WriteOptions::new()
            .with_byte_order(Endian::Little)
            .without_unknown_entries();
        assert_eq!(options.byte_order, Endian::Little);
        assert!(options.include_thumbnail);
        assert!(!options.include_unknown_entries);
    }
}
