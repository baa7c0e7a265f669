//! In-memory JPEG section scanning and Exif metadata reading and writing.
//!
//! This crate splits a JPEG into its marker sections, decodes the Exif (TIFF)
//! block of the APP1 section into a typed [`MetadataRecord`], and rebuilds
//! that block byte-exactly after edits. Pixel data is never decoded; the
//! entropy-coded scan is carried through untouched.
//!
//! # Design Principles
//!
//! - **In memory**: Every operation is a transform over owned byte buffers
//! - **Lazy decoding**: Exif is decoded the first time metadata is asked for
//! - **Bounded work**: Every offset is bounds-checked and sub-directory
//!   nesting has a hard ceiling
//! - **Graceful degradation**: A broken Exif block never makes the rest of the
//!   JPEG unusable
//!
//! # Quick Start
//!
//! ```no_run
//! use exif_io::{GeoLocation, JpegAsset};
//!
//! # fn main() -> exif_io::Result<()> {
//! let mut asset = JpegAsset::open("image.jpg")?;
//!
//! // Read metadata
//! if let Some(record) = asset.metadata() {
//!     println!("Camera: {:?} {:?}", record.make, record.model);
//!     println!("Taken: {:?}", record.date_time());
//! }
//!
//! // Edit, rebuild the Exif section and write
//! asset
//!     .metadata_mut()
//!     .set_location(GeoLocation::new(40.4462, -79.9822, 250.0));
//! asset.recreate_exif_section()?;
//! asset.write_to("output.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Lower-Level API
//!
//! The scanner and the TIFF codec can be used on their own:
//!
//! ```no_run
//! use exif_io::{tiff, JpegIO, Marker, WriteOptions};
//!
//! # fn main() -> exif_io::Result<()> {
//! let data = std::fs::read("image.jpg")?;
//! let handler = JpegIO::new();
//! let structure = handler.parse(&data)?;
//!
//! if let Some(section) = structure.find(Marker::Exif) {
//!     // The TIFF header follows the 6-byte "Exif\0\0" signature
//!     let record = tiff::decode(&section.data, 6)?;
//!     let tiff_block = tiff::encode(&record, &WriteOptions::default())?;
//!     println!("re-encoded Exif: {} bytes", tiff_block.len());
//! }
//! # Ok(())
//! # }
//! ```

mod asset;
mod byte_codec;
mod error;
pub mod formats;
pub mod metadata;
mod options;
mod rational;
pub mod segment;
mod structure;
pub mod thumbnail;
pub mod tiff;

pub use asset::{ImageAnnotations, ImageSource, JpegAsset};
pub use byte_codec::{ByteBuilder, Endian};
pub use error::{Error, Result};
pub use formats::JpegIO;
pub use metadata::{
    DateTimeEntry, DistanceRange, ExposureMode, ExposureProgram, GeoLocation, GpsInfo,
    LightSource, MetadataRecord, MeteringMode, Orientation, WhiteBalance,
};
pub use options::{ReadOptions, WriteOptions};
pub use rational::{CoordinateTriple, Rational, SignedRational};
pub use segment::{FrameInfo, FrameProcess, JfifHeader, Marker, Section};
pub use structure::Structure;
pub use thumbnail::{EmbeddedThumbnail, ThumbnailFormat};
pub use tiff::{
    maker_note::{MakerNote, Vendor},
    reader::ExifReader,
    tag_name, tags,
    writer::{EntryValue, TiffWriter},
    Directory, ExifFormat, RawEntry,
};

// Test utilities (available with test-utils feature or during tests)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
