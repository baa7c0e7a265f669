//! Embedded Exif thumbnails
//!
//! JPEG files commonly carry a small pre-rendered preview in the thumbnail
//! directory (IFD1) of their Exif block. The bytes are kept as-is; this crate
//! never decodes them.

/// Format of an embedded thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailFormat {
    /// JPEG thumbnail
    Jpeg,
    /// Other/unknown format
    Other,
}

impl ThumbnailFormat {
    /// Sniff the format from the leading bytes
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8]) {
            ThumbnailFormat::Jpeg
        } else {
            ThumbnailFormat::Other
        }
    }
}

/// A thumbnail extracted from (or destined for) IFD1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedThumbnail {
    /// Raw thumbnail data (already encoded)
    pub data: Vec<u8>,

    /// Format of the thumbnail
    pub format: ThumbnailFormat,
}

impl EmbeddedThumbnail {
    /// Wrap thumbnail bytes, detecting their format
    pub fn new(data: Vec<u8>) -> Self {
        let format = ThumbnailFormat::detect(&data);
        Self { data, format }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
