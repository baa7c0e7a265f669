//! Vendor maker notes
//!
//! The MakerNote tag holds a vendor-defined blob. A handful of vendors store a
//! TIFF directory inside it; the table below maps a camera-make prefix to the
//! layout used to find that directory. The blob itself is always kept and is
//! the only thing written back.
//!
//! Canon and Olympus directories address their values from the enclosing
//! TIFF header, so they break as soon as the blob moves. The reader stores
//! such a blob in a position-free form (big endian, value offsets relative to
//! the blob start) and the writer rebases it where the blob lands.

use super::{ExifFormat, RawEntry, ENTRY_SIZE};
use crate::{byte_codec::Endian, error::Result};

/// Camera vendor whose maker-note layout is understood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Canon,
    Olympus,
    Nikon,
    /// No handler matched; the blob is opaque
    Other,
}

/// Where a vendor's directory sits inside the maker-note blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Directory `skip` bytes into the blob, offsets relative to the
    /// enclosing TIFF header
    Directory { skip: usize },
    /// Complete TIFF header `skip` bytes into the blob, with its own byte
    /// order and offset base
    EmbeddedTiff { skip: usize },
}

struct VendorHandler {
    vendor: Vendor,
    make_prefix: &'static str,
    signature: &'static [u8],
    layout: Layout,
}

const VENDORS: &[VendorHandler] = &[
    VendorHandler {
        vendor: Vendor::Canon,
        make_prefix: "canon",
        signature: b"",
        layout: Layout::Directory { skip: 0 },
    },
    VendorHandler {
        vendor: Vendor::Olympus,
        make_prefix: "olympus",
        signature: b"OLYMP\0",
        layout: Layout::Directory { skip: 8 },
    },
    VendorHandler {
        vendor: Vendor::Nikon,
        make_prefix: "nikon",
        signature: b"Nikon\0",
        layout: Layout::EmbeddedTiff { skip: 10 },
    },
];

impl Vendor {
    /// Layout of this vendor's note, None for `Other`
    pub(crate) fn layout(self) -> Option<Layout> {
        VENDORS.iter().find(|h| h.vendor == self).map(|h| h.layout)
    }
}

/// Pick the handler for `make`, confirming its signature against `blob`
pub(crate) fn dispatch(make: Option<&str>, blob: &[u8]) -> Option<(Vendor, Layout)> {
    let make = make?.trim().to_ascii_lowercase();
    let handler = VENDORS
        .iter()
        .find(|h| make.starts_with(h.make_prefix))?;
    if !blob.starts_with(handler.signature) {
        log::debug!(
            "maker note for {:?} lacks its {:?} signature, keeping it opaque",
            handler.vendor,
            String::from_utf8_lossy(handler.signature)
        );
        return None;
    }
    Some((handler.vendor, handler.layout))
}

/// Rewrite the directory `skip` bytes into `blob` from one byte order and
/// offset base to another
///
/// Value offsets are read relative to `from_base` and written back relative
/// to `to_base`, with wrapping arithmetic so the two directions cancel.
/// Out-of-line values that sit inside the blob are re-ordered as well; values
/// elsewhere, and entries of unknown format, keep their bytes.
pub(crate) fn relocate_directory(
    blob: &mut [u8],
    skip: usize,
    from: Endian,
    to: Endian,
    from_base: u32,
    to_base: u32,
) -> Result<()> {
    let count = from.read_u16(blob, skip)? as usize;
    to.write_u16(blob, skip, count as u16)?;
    for index in 0..count {
        let position = skip + 2 + index * ENTRY_SIZE;
        let tag = from.read_u16(blob, position)?;
        let code = from.read_u16(blob, position + 2)?;
        let components = from.read_u32(blob, position + 4)?;
        let value = from.read_u32(blob, position + 8)?;
        to.write_u16(blob, position, tag)?;
        to.write_u16(blob, position + 2, code)?;
        to.write_u32(blob, position + 4, components)?;

        let format = match ExifFormat::from_code(code) {
            Some(format) => format,
            None => continue,
        };
        let len = match (components as usize).checked_mul(format.size()) {
            Some(len) => len,
            None => continue,
        };
        if len <= 4 {
            if let Some(inline) = blob.get_mut(position + 8..position + 8 + len) {
                from.convert_components(to, inline, format.swap_width());
            }
        } else {
            let local = value.wrapping_sub(from_base);
            to.write_u32(blob, position + 8, local.wrapping_add(to_base))?;
            let start = local as usize;
            if let Some(values) = start
                .checked_add(len)
                .and_then(|end| blob.get_mut(start..end))
            {
                from.convert_components(to, values, format.swap_width());
            }
        }
    }
    // Link to a following directory, when the blob has room for one
    let link = skip + 2 + count * ENTRY_SIZE;
    if let Ok(next) = from.read_u32(blob, link) {
        to.write_u32(blob, link, next)?;
    }
    Ok(())
}

/// A maker-note blob and whatever entries its vendor handler decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakerNote {
    pub vendor: Vendor,

    /// Blob from the MakerNote entry
    ///
    /// Verbatim unless `vendor` keeps a directory addressed from the TIFF
    /// header (Canon, Olympus). That directory is then held big endian with
    /// value offsets relative to the blob start, and the writer rebases it.
    pub data: Vec<u8>,

    /// Entries from the vendor directory, values normalised to big endian
    pub entries: Vec<RawEntry>,
}

impl MakerNote {
    /// An undecoded blob
    pub fn opaque(data: Vec<u8>) -> Self {
        Self {
            vendor: Vendor::Other,
            data,
            entries: Vec::new(),
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.vendor != Vendor::Other
    }

    /// Where the directory sits in `data` when the writer has to rebase it
    pub(crate) fn relocatable_directory(&self) -> Option<usize> {
        match self.vendor.layout()? {
            Layout::Directory { skip } => Some(skip),
            Layout::EmbeddedTiff { .. } => None,
        }
    }

    /// First decoded entry with this vendor tag
    pub fn entry(&self, tag: u16) -> Option<&RawEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}
