//! TIFF/Exif structures
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD0 offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! All offsets are relative to the start of the TIFF header. IFD0 may point at
//! an Exif sub-IFD and a GPS sub-IFD; its next-IFD offset leads to the
//! thumbnail directory (IFD1).

pub mod maker_note;
pub mod reader;
pub mod writer;

pub use reader::decode;
pub use writer::encode;

use crate::byte_codec::Endian;
use std::fmt;

/// Size of the TIFF header (order mark, magic, IFD0 offset)
pub const TIFF_HEADER_SIZE: usize = 8;

/// Fixed TIFF magic following the order mark
pub const TIFF_MAGIC: u16 = 0x002A;

/// Size of one directory entry
pub const ENTRY_SIZE: usize = 12;

/// Signature preceding the TIFF header in an APP1 Exif section
pub const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";

/// TIFF/EXIF tag IDs
pub mod tags {
    // IFD0 (main image) tags
    pub const IMAGE_WIDTH: u16 = 0x0100;
    pub const IMAGE_LENGTH: u16 = 0x0101;
    pub const COMPRESSION: u16 = 0x0103;
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const X_RESOLUTION: u16 = 0x011A;
    pub const Y_RESOLUTION: u16 = 0x011B;
    pub const RESOLUTION_UNIT: u16 = 0x0128;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATE_TIME: u16 = 0x0132;
    pub const ARTIST: u16 = 0x013B;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;

    // IFD1 (thumbnail) tags
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

    // EXIF sub-IFD tags
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const EXPOSURE_PROGRAM: u16 = 0x8822;
    pub const ISO_SPEED: u16 = 0x8827;
    pub const EXIF_VERSION: u16 = 0x9000;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
    pub const SHUTTER_SPEED_VALUE: u16 = 0x9201;
    pub const APERTURE_VALUE: u16 = 0x9202;
    pub const EXPOSURE_BIAS: u16 = 0x9204;
    pub const MAX_APERTURE_VALUE: u16 = 0x9205;
    pub const SUBJECT_DISTANCE: u16 = 0x9206;
    pub const METERING_MODE: u16 = 0x9207;
    pub const LIGHT_SOURCE: u16 = 0x9208;
    pub const FLASH: u16 = 0x9209;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const MAKER_NOTE: u16 = 0x927C;
    pub const USER_COMMENT: u16 = 0x9286;
    pub const FLASHPIX_VERSION: u16 = 0xA000;
    pub const COLOR_SPACE: u16 = 0xA001;
    pub const EXIF_IMAGE_WIDTH: u16 = 0xA002;
    pub const EXIF_IMAGE_LENGTH: u16 = 0xA003;
    pub const INTEROP_IFD_POINTER: u16 = 0xA005;
    pub const FOCAL_PLANE_X_RESOLUTION: u16 = 0xA20E;
    pub const FOCAL_PLANE_Y_RESOLUTION: u16 = 0xA20F;
    pub const FOCAL_PLANE_RESOLUTION_UNIT: u16 = 0xA210;
    pub const EXPOSURE_INDEX: u16 = 0xA215;
    pub const EXPOSURE_MODE: u16 = 0xA402;
    pub const WHITE_BALANCE: u16 = 0xA403;
    pub const DIGITAL_ZOOM_RATIO: u16 = 0xA404;
    pub const FOCAL_LENGTH_35MM: u16 = 0xA405;
    pub const SUBJECT_DISTANCE_RANGE: u16 = 0xA40C;

    // GPS sub-IFD tags
    pub const GPS_VERSION_ID: u16 = 0x0000;
    pub const GPS_LATITUDE_REF: u16 = 0x0001;
    pub const GPS_LATITUDE: u16 = 0x0002;
    pub const GPS_LONGITUDE_REF: u16 = 0x0003;
    pub const GPS_LONGITUDE: u16 = 0x0004;
    pub const GPS_ALTITUDE_REF: u16 = 0x0005;
    pub const GPS_ALTITUDE: u16 = 0x0006;
    pub const GPS_TIME_STAMP: u16 = 0x0007;
    pub const GPS_MAP_DATUM: u16 = 0x0012;
    pub const GPS_DATE_STAMP: u16 = 0x001D;
}

/// TIFF number formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExifFormat {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

impl ExifFormat {
    /// Map a format code (1-12); anything else is unsupported
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Ascii => 2,
            Self::Short => 3,
            Self::Long => 4,
            Self::Rational => 5,
            Self::SByte => 6,
            Self::Undefined => 7,
            Self::SShort => 8,
            Self::SLong => 9,
            Self::SRational => 10,
            Self::Float => 11,
            Self::Double => 12,
        }
    }

    /// Bytes per component
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }

    /// Width of the byte-order-sensitive unit inside one component
    pub fn swap_width(self) -> usize {
        match self {
            Self::Rational | Self::SRational => 4,
            other => other.size(),
        }
    }
}

/// Which directory an entry was read from or belongs to
///
/// Ordered the way the writer lays directories out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directory {
    /// Main image (IFD0)
    Ifd0,
    /// Exif sub-IFD
    Exif,
    /// GPS sub-IFD
    Gps,
    /// Thumbnail directory (IFD1)
    Thumbnail,
    /// Vendor maker-note directory
    MakerNote,
}

impl Directory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ifd0 => "ifd0",
            Self::Exif => "exif",
            Self::Gps => "gps",
            Self::Thumbnail => "ifd1",
            Self::MakerNote => "makernote",
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry kept verbatim because no field claims it
///
/// `value` holds `count` components with multi-byte units stored big endian,
/// whatever the byte order of the block it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub directory: Directory,
    pub tag: u16,
    pub format: ExifFormat,
    pub count: u32,
    pub value: Vec<u8>,
}

impl RawEntry {
    /// Value bytes re-ordered for `order`
    pub fn value_in(&self, order: Endian) -> Vec<u8> {
        let mut value = self.value.clone();
        Endian::Big.convert_components(order, &mut value, self.format.swap_width());
        value
    }
}

const TAG_NAMES: &[(u16, &str)] = &[
    (tags::IMAGE_WIDTH, "ImageWidth"),
    (tags::IMAGE_LENGTH, "ImageLength"),
    (tags::COMPRESSION, "Compression"),
    (tags::IMAGE_DESCRIPTION, "ImageDescription"),
    (tags::MAKE, "Make"),
    (tags::MODEL, "Model"),
    (tags::ORIENTATION, "Orientation"),
    (tags::X_RESOLUTION, "XResolution"),
    (tags::Y_RESOLUTION, "YResolution"),
    (tags::RESOLUTION_UNIT, "ResolutionUnit"),
    (tags::SOFTWARE, "Software"),
    (tags::DATE_TIME, "DateTime"),
    (tags::ARTIST, "Artist"),
    (tags::JPEG_INTERCHANGE_FORMAT, "ThumbnailOffset"),
    (tags::JPEG_INTERCHANGE_FORMAT_LENGTH, "ThumbnailLength"),
    (tags::COPYRIGHT, "Copyright"),
    (tags::EXPOSURE_TIME, "ExposureTime"),
    (tags::F_NUMBER, "FNumber"),
    (tags::EXIF_IFD_POINTER, "ExifOffset"),
    (tags::EXPOSURE_PROGRAM, "ExposureProgram"),
    (tags::GPS_IFD_POINTER, "GPSInfo"),
    (tags::ISO_SPEED, "ISOSpeedRatings"),
    (tags::EXIF_VERSION, "ExifVersion"),
    (tags::DATE_TIME_ORIGINAL, "DateTimeOriginal"),
    (tags::DATE_TIME_DIGITIZED, "DateTimeDigitized"),
    (tags::SHUTTER_SPEED_VALUE, "ShutterSpeedValue"),
    (tags::APERTURE_VALUE, "ApertureValue"),
    (tags::EXPOSURE_BIAS, "ExposureBiasValue"),
    (tags::MAX_APERTURE_VALUE, "MaxApertureValue"),
    (tags::SUBJECT_DISTANCE, "SubjectDistance"),
    (tags::METERING_MODE, "MeteringMode"),
    (tags::LIGHT_SOURCE, "LightSource"),
    (tags::FLASH, "Flash"),
    (tags::FOCAL_LENGTH, "FocalLength"),
    (tags::MAKER_NOTE, "MakerNote"),
    (tags::USER_COMMENT, "UserComment"),
    (tags::FLASHPIX_VERSION, "FlashPixVersion"),
    (tags::COLOR_SPACE, "ColorSpace"),
    (tags::EXIF_IMAGE_WIDTH, "ExifImageWidth"),
    (tags::EXIF_IMAGE_LENGTH, "ExifImageLength"),
    (tags::INTEROP_IFD_POINTER, "InteroperabilityOffset"),
    (tags::FOCAL_PLANE_X_RESOLUTION, "FocalPlaneXResolution"),
    (tags::FOCAL_PLANE_Y_RESOLUTION, "FocalPlaneYResolution"),
    (tags::FOCAL_PLANE_RESOLUTION_UNIT, "FocalPlaneResolutionUnit"),
    (tags::EXPOSURE_INDEX, "ExposureIndex"),
    (tags::EXPOSURE_MODE, "ExposureMode"),
    (tags::WHITE_BALANCE, "WhiteBalance"),
    (tags::DIGITAL_ZOOM_RATIO, "DigitalZoomRatio"),
    (tags::FOCAL_LENGTH_35MM, "FocalLengthIn35mmFilm"),
    (tags::SUBJECT_DISTANCE_RANGE, "SubjectDistanceRange"),
];

const GPS_TAG_NAMES: &[(u16, &str)] = &[
    (tags::GPS_VERSION_ID, "GPSVersionID"),
    (tags::GPS_LATITUDE_REF, "GPSLatitudeRef"),
    (tags::GPS_LATITUDE, "GPSLatitude"),
    (tags::GPS_LONGITUDE_REF, "GPSLongitudeRef"),
    (tags::GPS_LONGITUDE, "GPSLongitude"),
    (tags::GPS_ALTITUDE_REF, "GPSAltitudeRef"),
    (tags::GPS_ALTITUDE, "GPSAltitude"),
    (tags::GPS_TIME_STAMP, "GPSTimeStamp"),
    (tags::GPS_MAP_DATUM, "GPSMapDatum"),
    (tags::GPS_DATE_STAMP, "GPSDateStamp"),
];

/// Descriptive name of a tag, for diagnostics only
///
/// GPS tags reuse small numbers, so the directory selects the table.
pub fn tag_name(directory: Directory, tag: u16) -> Option<&'static str> {
    let table = match directory {
        Directory::Gps => GPS_TAG_NAMES,
        Directory::MakerNote => return None,
        _ => TAG_NAMES,
    };
    table
        .iter()
        .find(|(id, _)| *id == tag)
        .map(|(_, name)| *name)
}

/// Tag name or its hex id
pub(crate) fn describe_tag(directory: Directory, tag: u16) -> String {
    match tag_name(directory, tag) {
        Some(name) => name.to_string(),
        None => format!("0x{:04X}", tag),
    }
}
