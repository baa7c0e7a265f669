//! Test utilities for building JPEG and TIFF fixtures in memory.
//!
//! This module provides:
//! - [`TiffFixture`]: hand-laid TIFF blocks, including malformed ones
//!   (offset cycles, bad formats, out-of-range pointers)
//! - JPEG builders wrapping arbitrary sections around a small scan
//! - Access to real-world files in a directory named by the
//!   `EXIF_IO_TEST_FIXTURES` env var
//!
//! # Usage
//!
//! ```
//! use exif_io::test_utils::*;
//! use exif_io::{tags, Endian};
//!
//! let mut tiff = TiffFixture::new(Endian::Big);
//! tiff.directory(&[FixtureEntry::ascii(tags::MAKE, "Canon")], 0);
//! let jpeg = jpeg_with_sections(&[(0xE1, exif_payload(&tiff.finish()))]);
//! assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
//! ```

use std::{fs, path::PathBuf};

use crate::{
    byte_codec::{ByteBuilder, Endian},
    tiff::EXIF_SIGNATURE,
    Result,
};

/// Environment variable naming a directory of extra JPEG fixtures
pub const FIXTURES_ENV: &str = "EXIF_IO_TEST_FIXTURES";

/// 14-byte JFIF 1.01 APP0 payload, 1:1 aspect, no thumbnail
pub const JFIF_PAYLOAD: &[u8] = b"JFIF\0\x01\x01\x00\x00\x01\x00\x01\x00\x00";

/// SOS header, a few entropy-coded bytes (with a stuffed 0xFF) and EOI
pub const SCAN_TAIL: &[u8] = &[
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, // SOS
    0x12, 0x34, 0x56, 0xFF, 0x00, 0x78, // entropy data
    0xFF, 0xD9, // EOI
];

/// Quantization table: 8-bit precision, table 0, all ones
pub fn dqt_payload() -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&[1u8; 64]);
    payload
}

/// Baseline frame header: 8-bit, `width` x `height`, one component
pub fn sof0_payload(width: u16, height: u16) -> Vec<u8> {
    let mut payload = vec![8];
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&[1, 1, 0x11, 0]);
    payload
}

/// Huffman table with a single one-bit code
pub fn dht_payload() -> Vec<u8> {
    let mut payload = vec![0x00, 1];
    payload.extend_from_slice(&[0u8; 15]);
    payload.push(0x00);
    payload
}

/// `Exif\0\0` followed by `tiff`
pub fn exif_payload(tiff: &[u8]) -> Vec<u8> {
    let mut payload = EXIF_SIGNATURE.to_vec();
    payload.extend_from_slice(tiff);
    payload
}

/// SOI, every `(marker, payload)` section, then [`SCAN_TAIL`]
pub fn jpeg_with_sections(sections: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    for (marker, payload) in sections {
        jpeg.extend_from_slice(&[0xFF, *marker]);
        jpeg.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        jpeg.extend_from_slice(payload);
    }
    jpeg.extend_from_slice(SCAN_TAIL);
    jpeg
}

/// A small but structurally complete JPEG without metadata:
/// APP0, DQT, SOF0 (16x8), DHT, scan
pub fn minimal_jpeg() -> Vec<u8> {
    jpeg_with_sections(&[
        (0xE0, JFIF_PAYLOAD.to_vec()),
        (0xDB, dqt_payload()),
        (0xC0, sof0_payload(16, 8)),
        (0xC4, dht_payload()),
    ])
}

/// [`minimal_jpeg`] with an Exif APP1 section wrapping `tiff`
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    jpeg_with_sections(&[
        (0xE0, JFIF_PAYLOAD.to_vec()),
        (0xE1, exif_payload(tiff)),
        (0xDB, dqt_payload()),
        (0xC0, sof0_payload(16, 8)),
        (0xC4, dht_payload()),
    ])
}

#[derive(Debug, Clone)]
enum FixtureValue {
    Ascii(String),
    Short(u16),
    Long(u32),
    Rationals(Vec<(u32, u32)>),
    Undefined(Vec<u8>),
}

impl FixtureValue {
    fn encode(&self, order: Endian) -> Vec<u8> {
        let mut out = ByteBuilder::new(order);
        match self {
            FixtureValue::Ascii(text) => {
                out.put_bytes(text.as_bytes());
                out.put_u8(0);
            }
            FixtureValue::Short(value) => out.put_u16(*value),
            FixtureValue::Long(value) => out.put_u32(*value),
            FixtureValue::Rationals(values) => {
                for (numerator, denominator) in values {
                    out.put_u32(*numerator);
                    out.put_u32(*denominator);
                }
            }
            FixtureValue::Undefined(bytes) => out.put_bytes(bytes),
        }
        out.into_inner()
    }
}

/// One directory entry of a [`TiffFixture`]
///
/// Format and count follow from the value unless overridden, which is how
/// malformed entries are made.
#[derive(Debug, Clone)]
pub struct FixtureEntry {
    pub tag: u16,
    pub format: u16,
    pub count: u32,
    value: FixtureValue,
}

impl FixtureEntry {
    pub fn ascii(tag: u16, text: &str) -> Self {
        Self {
            tag,
            format: 2,
            count: text.len() as u32 + 1,
            value: FixtureValue::Ascii(text.to_string()),
        }
    }

    pub fn short(tag: u16, value: u16) -> Self {
        Self {
            tag,
            format: 3,
            count: 1,
            value: FixtureValue::Short(value),
        }
    }

    pub fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            format: 4,
            count: 1,
            value: FixtureValue::Long(value),
        }
    }

    pub fn rationals(tag: u16, values: &[(u32, u32)]) -> Self {
        Self {
            tag,
            format: 5,
            count: values.len() as u32,
            value: FixtureValue::Rationals(values.to_vec()),
        }
    }

    pub fn undefined(tag: u16, bytes: &[u8]) -> Self {
        Self {
            tag,
            format: 7,
            count: bytes.len() as u32,
            value: FixtureValue::Undefined(bytes.to_vec()),
        }
    }

    /// Override the declared format code
    pub fn with_format(mut self, format: u16) -> Self {
        self.format = format;
        self
    }

    /// Override the declared component count
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Hand-laid TIFF block
///
/// The header points IFD0 at offset 8, so the first directory created is
/// IFD0. Directories can be reserved first and filled later to build
/// forward references and cycles.
#[derive(Debug, Clone)]
pub struct TiffFixture {
    order: Endian,
    data: Vec<u8>,
}

impl TiffFixture {
    pub fn new(order: Endian) -> Self {
        let mut header = ByteBuilder::new(order);
        header.put_bytes(order.order_mark());
        header.put_u16(0x002A);
        header.put_u32(8);
        Self {
            order,
            data: header.into_inner(),
        }
    }

    pub fn order(&self) -> Endian {
        self.order
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Point the header at a different IFD0
    pub fn set_ifd0_offset(&mut self, offset: u32) {
        let mut bytes = ByteBuilder::new(self.order);
        bytes.put_u32(offset);
        self.write_at(4, bytes.as_slice());
    }

    /// Append raw bytes, padded to an even length; returns their offset
    pub fn append(&mut self, bytes: &[u8]) -> u32 {
        let at = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        if self.data.len() % 2 == 1 {
            self.data.push(0);
        }
        at
    }

    /// Reserve zeroed space for a directory of `count` entries
    pub fn reserve_directory(&mut self, count: usize) -> u32 {
        self.append(&vec![0u8; 2 + count * 12 + 4])
    }

    /// Write a directory table at `at`; values over 4 bytes are appended
    pub fn fill_directory(&mut self, at: u32, entries: &[FixtureEntry], next: u32) {
        let mut table = ByteBuilder::new(self.order);
        table.put_u16(entries.len() as u16);
        for entry in entries {
            let bytes = entry.value.encode(self.order);
            table.put_u16(entry.tag);
            table.put_u16(entry.format);
            table.put_u32(entry.count);
            if bytes.len() <= 4 {
                table.put_bytes(&bytes);
                table.put_zeros(4 - bytes.len());
            } else {
                let offset = self.append(&bytes);
                table.put_u32(offset);
            }
        }
        table.put_u32(next);
        self.write_at(at as usize, table.as_slice());
    }

    /// Reserve and fill a directory in one step
    pub fn directory(&mut self, entries: &[FixtureEntry], next: u32) -> u32 {
        let at = self.reserve_directory(entries.len());
        self.fill_directory(at, entries, next);
        at
    }

    fn write_at(&mut self, at: usize, bytes: &[u8]) {
        let end = at + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[at..end].copy_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Directory named by `EXIF_IO_TEST_FIXTURES`, when set and present
pub fn fixture_dir() -> Option<PathBuf> {
    let dir = PathBuf::from(std::env::var_os(FIXTURES_ENV)?);
    dir.is_dir().then_some(dir)
}

/// JPEG files in the fixture directory, sorted; empty when none is configured
pub fn list_fixtures() -> Result<Vec<PathBuf>> {
    let Some(dir) = fixture_dir() else {
        return Ok(Vec::new());
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if is_jpeg {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
