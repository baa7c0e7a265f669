//! JPEG marker kinds and sections

use crate::{
    error::{Error, Result},
    tiff::EXIF_SIGNATURE,
};
use std::fmt;

// JPEG markers
pub const SOI: u8 = 0xD8; // Start of Image
pub const EOI: u8 = 0xD9; // End of Image
pub const SOS: u8 = 0xDA; // Start of Scan (image data follows)
pub const DQT: u8 = 0xDB;
pub const DRI: u8 = 0xDD;
pub const DHT: u8 = 0xC4;
pub const APP0: u8 = 0xE0; // JFIF
pub const APP1: u8 = 0xE1; // EXIF / XMP
pub const APP13: u8 = 0xED; // IPTC
pub const COM: u8 = 0xFE;

// Markers without a length field
pub const TEM: u8 = 0x01;
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;

// SOFn codes that are not frame headers
const JPG: u8 = 0xC8;
const DAC: u8 = 0xCC;

pub const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Max payload of one marker section (length field counts itself)
pub const MAX_SECTION_PAYLOAD: usize = 65533;

const SOF_LABELS: [&str; 16] = [
    "SOF0", "SOF1", "SOF2", "SOF3", "DHT", "SOF5", "SOF6", "SOF7", "JPG", "SOF9", "SOF10",
    "SOF11", "DAC", "SOF13", "SOF14", "SOF15",
];

const APP_LABELS: [&str; 16] = [
    "APP0", "APP1", "APP2", "APP3", "APP4", "APP5", "APP6", "APP7", "APP8", "APP9", "APP10",
    "APP11", "APP12", "APP13", "APP14", "APP15",
];

const RST_LABELS: [&str; 8] = [
    "RST0", "RST1", "RST2", "RST3", "RST4", "RST5", "RST6", "RST7",
];

/// Kind of a JPEG section
///
/// APP1 is split by payload signature into [`Marker::Exif`] and
/// [`Marker::Xmp`]; any other APP1 is `App(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Soi,
    Eoi,
    Sos,
    /// APP0
    Jfif,
    /// APP1 carrying `Exif\0\0`
    Exif,
    /// APP1 carrying the XMP namespace signature
    Xmp,
    /// APP13
    Iptc,
    /// Other APPn, by n
    App(u8),
    Comment,
    Dqt,
    Dht,
    Dri,
    /// Start of frame, by n (0-15, never 4, 8 or 12)
    Sof(u8),
    /// Restart marker, by n
    Rst(u8),
    Other(u8),
}

impl Marker {
    /// Kind from the marker byte alone
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            SOI => Marker::Soi,
            EOI => Marker::Eoi,
            SOS => Marker::Sos,
            APP0 => Marker::Jfif,
            APP13 => Marker::Iptc,
            0xE1..=0xEF => Marker::App(byte - APP0),
            COM => Marker::Comment,
            DQT => Marker::Dqt,
            DHT => Marker::Dht,
            DRI => Marker::Dri,
            JPG | DAC => Marker::Other(byte),
            0xC0..=0xCF => Marker::Sof(byte - 0xC0),
            RST0..=RST7 => Marker::Rst(byte - RST0),
            _ => Marker::Other(byte),
        }
    }

    /// Kind from the marker byte, refined by the payload signature
    pub fn classify(byte: u8, payload: &[u8]) -> Self {
        if byte == APP1 {
            if payload.starts_with(EXIF_SIGNATURE) {
                return Marker::Exif;
            }
            if payload.starts_with(XMP_SIGNATURE) {
                return Marker::Xmp;
            }
        }
        Self::from_byte(byte)
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Marker::Soi => SOI,
            Marker::Eoi => EOI,
            Marker::Sos => SOS,
            Marker::Jfif => APP0,
            Marker::Exif | Marker::Xmp => APP1,
            Marker::Iptc => APP13,
            Marker::App(n) => APP0 + (n & 0x0F),
            Marker::Comment => COM,
            Marker::Dqt => DQT,
            Marker::Dht => DHT,
            Marker::Dri => DRI,
            Marker::Sof(n) => 0xC0 + (n & 0x0F),
            Marker::Rst(n) => RST0 + (n & 0x07),
            Marker::Other(byte) => byte,
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Marker::Soi => "SOI",
            Marker::Eoi => "EOI",
            Marker::Sos => "SOS",
            Marker::Jfif => "APP0",
            Marker::Exif => "APP1 (Exif)",
            Marker::Xmp => "APP1 (XMP)",
            Marker::Iptc => "APP13",
            Marker::App(n) => APP_LABELS[(n & 0x0F) as usize],
            Marker::Comment => "COM",
            Marker::Dqt => "DQT",
            Marker::Dht => "DHT",
            Marker::Dri => "DRI",
            Marker::Sof(n) => SOF_LABELS[(n & 0x0F) as usize],
            Marker::Rst(n) => RST_LABELS[(n & 0x07) as usize],
            Marker::Other(_) => "OTHER",
        }
    }

    /// False for stand-alone markers (SOI, EOI, RSTn, TEM)
    pub fn has_length(self) -> bool {
        !matches!(
            self,
            Marker::Soi | Marker::Eoi | Marker::Rst(_) | Marker::Other(TEM)
        )
    }

    pub fn is_app(self) -> bool {
        matches!(
            self,
            Marker::Jfif | Marker::Exif | Marker::Xmp | Marker::Iptc | Marker::App(_)
        )
    }

    /// Kinds kept by [`Structure::remove_unknown`](crate::Structure::remove_unknown)
    pub fn is_standard(self) -> bool {
        matches!(
            self,
            Marker::Sof(_)
                | Marker::Soi
                | Marker::Eoi
                | Marker::Sos
                | Marker::Jfif
                | Marker::Exif
                | Marker::Xmp
                | Marker::Comment
                | Marker::Dqt
                | Marker::Dht
                | Marker::Dri
                | Marker::Iptc
        )
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.label(), self.to_byte())
    }
}

/// One marker section: kind plus payload (without marker or length bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub marker: Marker,
    pub data: Vec<u8>,
}

impl Section {
    pub fn new(marker: Marker, data: Vec<u8>) -> Self {
        Self { marker, data }
    }

    /// Size on disk, including marker and length bytes
    pub fn encoded_len(&self) -> usize {
        if self.marker.has_length() {
            4 + self.data.len()
        } else {
            2
        }
    }

    /// Payload after the `Exif\0\0` signature, for Exif sections
    pub fn exif_tiff(&self) -> Option<&[u8]> {
        match self.marker {
            Marker::Exif => self.data.get(EXIF_SIGNATURE.len()..),
            _ => None,
        }
    }
}

/// Compression process of a frame, by SOFn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameProcess {
    Baseline,
    ExtendedSequential,
    Progressive,
    Lossless,
    DifferentialSequential,
    DifferentialProgressive,
    DifferentialLossless,
    ArithmeticSequential,
    ArithmeticProgressive,
    ArithmeticLossless,
    ArithmeticDifferentialSequential,
    ArithmeticDifferentialProgressive,
    ArithmeticDifferentialLossless,
}

impl FrameProcess {
    pub fn from_sof(n: u8) -> Option<Self> {
        Some(match n {
            0 => Self::Baseline,
            1 => Self::ExtendedSequential,
            2 => Self::Progressive,
            3 => Self::Lossless,
            5 => Self::DifferentialSequential,
            6 => Self::DifferentialProgressive,
            7 => Self::DifferentialLossless,
            9 => Self::ArithmeticSequential,
            10 => Self::ArithmeticProgressive,
            11 => Self::ArithmeticLossless,
            13 => Self::ArithmeticDifferentialSequential,
            14 => Self::ArithmeticDifferentialProgressive,
            15 => Self::ArithmeticDifferentialLossless,
            _ => return None,
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Baseline => "Baseline",
            Self::ExtendedSequential => "Extended sequential",
            Self::Progressive => "Progressive",
            Self::Lossless => "Lossless",
            Self::DifferentialSequential => "Differential sequential",
            Self::DifferentialProgressive => "Differential progressive",
            Self::DifferentialLossless => "Differential lossless",
            Self::ArithmeticSequential => "Extended sequential, arithmetic coding",
            Self::ArithmeticProgressive => "Progressive, arithmetic coding",
            Self::ArithmeticLossless => "Lossless, arithmetic coding",
            Self::ArithmeticDifferentialSequential => {
                "Differential sequential, arithmetic coding"
            }
            Self::ArithmeticDifferentialProgressive => {
                "Differential progressive, arithmetic coding"
            }
            Self::ArithmeticDifferentialLossless => "Differential lossless, arithmetic coding",
        }
    }
}

/// Frame header fields from a SOFn section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub process: FrameProcess,
    /// Bits per sample
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    /// 1 = greyscale, 3 = color
    pub components: u8,
}

impl FrameInfo {
    pub fn parse(section: &Section) -> Result<Self> {
        let Marker::Sof(n) = section.marker else {
            return Err(Error::InvalidSegment {
                offset: 0,
                reason: format!("{} is not a frame header", section.marker),
            });
        };
        let process = FrameProcess::from_sof(n).ok_or_else(|| Error::InvalidSegment {
            offset: 0,
            reason: format!("SOF{} is not a frame header", n),
        })?;
        let data = &section.data;
        if data.len() < 6 {
            return Err(Error::InvalidSegment {
                offset: 0,
                reason: format!("frame header of {} bytes", data.len()),
            });
        }
        Ok(Self {
            process,
            precision: data[0],
            height: u16::from_be_bytes([data[1], data[2]]),
            width: u16::from_be_bytes([data[3], data[4]]),
            components: data[5],
        })
    }

    pub fn is_color(&self) -> bool {
        self.components == 3
    }
}

/// JFIF APP0 header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifHeader {
    pub major_version: u8,
    pub minor_version: u8,
    /// 0 = aspect ratio only, 1 = dots per inch, 2 = dots per cm
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,
}

impl JfifHeader {
    const SIGNATURE: &'static [u8] = b"JFIF\0";

    /// None unless the payload starts with the JFIF signature
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 12 || !payload.starts_with(Self::SIGNATURE) {
            return None;
        }
        Some(Self {
            major_version: payload[5],
            minor_version: payload[6],
            density_units: payload[7],
            x_density: u16::from_be_bytes([payload[8], payload[9]]),
            y_density: u16::from_be_bytes([payload[10], payload[11]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_bytes() {
        for byte in 0xC0..=0xFEu8 {
            assert_eq!(Marker::from_byte(byte).to_byte(), byte);
        }
        assert_eq!(Marker::from_byte(0xC4), Marker::Dht);
        assert_eq!(Marker::from_byte(0xC2), Marker::Sof(2));
        assert_eq!(Marker::from_byte(0xC8), Marker::Other(0xC8));
        assert_eq!(Marker::from_byte(0xE1), Marker::App(1));
        assert_eq!(Marker::from_byte(0xD3), Marker::Rst(3));
    }

    #[test]
    fn test_classify_app1() {
        assert_eq!(Marker::classify(APP1, b"Exif\0\0MM"), Marker::Exif);
        assert_eq!(
            Marker::classify(APP1, b"http://ns.adobe.com/xap/1.0/\0<x/>"),
            Marker::Xmp
        );
        assert_eq!(Marker::classify(APP1, b"other"), Marker::App(1));
        assert_eq!(Marker::classify(APP0, b"Exif\0\0"), Marker::Jfif);
    }

    #[test]
    fn test_standard_kinds() {
        assert!(Marker::Sof(2).is_standard());
        assert!(Marker::Iptc.is_standard());
        assert!(Marker::Xmp.is_standard());
        assert!(!Marker::App(2).is_standard());
        assert!(!Marker::App(1).is_standard());
        assert!(!Marker::Other(0xC8).is_standard());
    }

    #[test]
    fn test_stand_alone_markers() {
        assert!(!Marker::Rst(0).has_length());
        assert!(!Marker::from_byte(TEM).has_length());
        assert!(Marker::Comment.has_length());
        assert_eq!(Section::new(Marker::Rst(1), vec![]).encoded_len(), 2);
    }

    #[test]
    fn test_frame_info() {
        let section = Section::new(Marker::Sof(2), vec![8, 0x01, 0xE0, 0x02, 0x80, 3]);
        let frame = FrameInfo::parse(&section).unwrap();
        assert_eq!(frame.process, FrameProcess::Progressive);
        assert_eq!((frame.width, frame.height), (640, 480));
        assert!(frame.is_color());

        let short = Section::new(Marker::Sof(0), vec![8, 0]);
        assert!(FrameInfo::parse(&short).is_err());
        assert!(FrameInfo::parse(&Section::new(Marker::Dqt, vec![0; 8])).is_err());
    }

    #[test]
    fn test_jfif_header() {
        let header = JfifHeader::parse(b"JFIF\0\x01\x02\x01\x00\x48\x00\x48\x00\x00").unwrap();
        assert_eq!((header.major_version, header.minor_version), (1, 2));
        assert_eq!(header.density_units, 1);
        assert_eq!(header.x_density, 72);
        assert!(JfifHeader::parse(b"JFXX\0\x10").is_none());
    }
}
