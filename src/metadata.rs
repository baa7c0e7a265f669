//! Decoded Exif metadata
//!
//! [`MetadataRecord`] holds every field the reader recognises, stored in its
//! raw TIFF form so that decoding a freshly written block reproduces the
//! record exactly. Convenience accessors convert to decimal values.

use crate::{
    rational::{CoordinateTriple, Rational, SignedRational},
    thumbnail::EmbeddedThumbnail,
    tiff::{maker_note::MakerNote, tags, Directory, RawEntry},
};
use std::fmt;

/// Define a TIFF enumeration with a catch-all for codes outside the table
macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
            /// Code outside the known table
            Unrecognized(u16),
        }

        impl $name {
            pub fn from_code(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    other => Self::Unrecognized(other),
                }
            }

            pub fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unrecognized(code) => code,
                }
            }
        }
    };
}

code_enum!(
    /// Metering mode (tag 0x9207)
    MeteringMode {
        Unspecified = 0,
        Average = 1,
        CenterWeighted = 2,
        Spot = 3,
        MultiSpot = 4,
        Pattern = 5,
        Partial = 6,
        Other = 255,
    }
);

code_enum!(
    /// Exposure program (tag 0x8822)
    ExposureProgram {
        Unspecified = 0,
        Manual = 1,
        Normal = 2,
        AperturePriority = 3,
        ShutterPriority = 4,
        Creative = 5,
        Action = 6,
        Portrait = 7,
        Landscape = 8,
    }
);

code_enum!(
    /// Exposure mode (tag 0xA402)
    ExposureMode {
        Auto = 0,
        Manual = 1,
        AutoBracket = 2,
    }
);

code_enum!(
    /// White balance (tag 0xA403)
    WhiteBalance {
        Auto = 0,
        Manual = 1,
    }
);

code_enum!(
    /// Light source (tag 0x9208)
    LightSource {
        Unknown = 0,
        Daylight = 1,
        Fluorescent = 2,
        Tungsten = 3,
        Flash = 4,
        FineWeather = 9,
        Cloudy = 10,
        Shade = 11,
    }
);

code_enum!(
    /// Subject distance range (tag 0xA40C)
    DistanceRange {
        Unspecified = 0,
        Macro = 1,
        Close = 2,
        Distant = 3,
    }
);

/// Exif orientation (tag 0x0112), named after the platform image orientation
/// it corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// 1: row 0 at top, column 0 at left
    Up,
    /// 2: mirrored horizontally
    UpMirrored,
    /// 3: rotated 180
    Down,
    /// 4: mirrored vertically
    DownMirrored,
    /// 5: mirrored horizontally, rotated 270 CW
    LeftMirrored,
    /// 6: rotated 90 CW
    Right,
    /// 7: mirrored horizontally, rotated 90 CW
    RightMirrored,
    /// 8: rotated 270 CW
    Left,
}

const ORIENTATIONS: [(Orientation, u16, &str); 8] = [
    (Orientation::Up, 1, "Up"),
    (Orientation::UpMirrored, 2, "UpMirrored"),
    (Orientation::Down, 3, "Down"),
    (Orientation::DownMirrored, 4, "DownMirrored"),
    (Orientation::LeftMirrored, 5, "LeftMirrored"),
    (Orientation::Right, 6, "Right"),
    (Orientation::RightMirrored, 7, "RightMirrored"),
    (Orientation::Left, 8, "Left"),
];

impl Orientation {
    pub fn from_code(code: u16) -> Option<Self> {
        ORIENTATIONS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(o, _, _)| *o)
    }

    pub fn code(self) -> u16 {
        ORIENTATIONS
            .iter()
            .find(|(o, _, _)| *o == self)
            .map(|(_, c, _)| *c)
            .unwrap_or(1)
    }

    /// Platform orientation name
    pub fn name(self) -> &'static str {
        ORIENTATIONS
            .iter()
            .find(|(o, _, _)| *o == self)
            .map(|(_, _, n)| *n)
            .unwrap_or("Up")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ORIENTATIONS
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(o, _, _)| *o)
    }
}

/// Plain decimal location handed to and from a geolocation collaborator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoLocation {
    /// Degrees, negative south of the equator
    pub latitude: f64,
    /// Degrees, negative west of Greenwich
    pub longitude: f64,
    /// Meters, negative below sea level
    pub altitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Contents of the GPS sub-IFD
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpsInfo {
    /// 'N' or 'S'
    pub latitude_ref: Option<char>,
    pub latitude: Option<CoordinateTriple>,
    /// 'E' or 'W'
    pub longitude_ref: Option<char>,
    pub longitude: Option<CoordinateTriple>,
    /// 0 above sea level, 1 below
    pub altitude_ref: Option<u8>,
    pub altitude: Option<Rational>,
}

fn signed_degrees(triple: CoordinateTriple, reference: Option<char>, negative: char) -> f64 {
    let degrees = triple.to_degrees();
    match reference {
        Some(r) if r.eq_ignore_ascii_case(&negative) => -degrees,
        _ => degrees,
    }
}

impl GpsInfo {
    /// Decimal latitude, negative for an 'S' reference
    pub fn latitude_degrees(&self) -> Option<f64> {
        Some(signed_degrees(self.latitude?, self.latitude_ref, 'S'))
    }

    /// Decimal longitude, negative for a 'W' reference
    pub fn longitude_degrees(&self) -> Option<f64> {
        Some(signed_degrees(self.longitude?, self.longitude_ref, 'W'))
    }

    /// Altitude in meters, negative when the reference byte is 1
    pub fn altitude_meters(&self) -> Option<f64> {
        let meters = self.altitude?.to_f64();
        Some(if self.altitude_ref == Some(1) {
            -meters
        } else {
            meters
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == GpsInfo::default()
    }
}

/// One occurrence of a date/time tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeEntry {
    /// Directory the tag came from
    pub directory: Directory,
    /// DateTime, DateTimeOriginal or DateTimeDigitized
    pub tag: u16,
    /// "YYYY:MM:DD HH:MM:SS"
    pub value: String,
}

impl DateTimeEntry {
    pub fn new(directory: Directory, tag: u16, value: impl Into<String>) -> Self {
        Self {
            directory,
            tag,
            value: value.into(),
        }
    }
}

/// Metadata decoded from, or destined for, an Exif block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    /// Camera manufacturer (e.g., "Canon", "Nikon")
    pub make: Option<String>,
    /// Camera model (e.g., "EOS R5", "D850")
    pub model: Option<String>,
    pub image_description: Option<String>,
    /// Software used to create/edit the image
    pub software: Option<String>,
    /// Artist/photographer name
    pub artist: Option<String>,
    /// Copyright notice
    pub copyright: Option<String>,
    /// UserComment text, without its character-code prefix
    pub user_comment: Option<String>,
    /// Every date/time tag seen, bounded by `ReadOptions::max_date_copies`
    ///
    /// Held in (directory, tag) order with at most one entry per pair; go
    /// through `push_date_time` to keep it that way.
    pub date_times: Vec<DateTimeEntry>,

    /// Raw orientation code (1-8 when valid)
    pub orientation: Option<u16>,
    pub x_resolution: Option<Rational>,
    pub y_resolution: Option<Rational>,
    pub resolution_unit: Option<u16>,

    pub exposure_time: Option<Rational>,
    pub f_number: Option<Rational>,
    pub exposure_program: Option<ExposureProgram>,
    pub iso: Option<u16>,
    pub exposure_bias: Option<SignedRational>,
    pub subject_distance: Option<Rational>,
    pub metering_mode: Option<MeteringMode>,
    pub light_source: Option<LightSource>,
    pub flash: Option<u16>,
    pub focal_length: Option<Rational>,
    pub exif_image_width: Option<u32>,
    pub exif_image_length: Option<u32>,
    pub focal_plane_x_resolution: Option<Rational>,
    pub focal_plane_resolution_unit: Option<u16>,
    pub exposure_mode: Option<ExposureMode>,
    pub white_balance: Option<WhiteBalance>,
    pub digital_zoom_ratio: Option<Rational>,
    pub focal_length_35mm: Option<u16>,
    pub distance_range: Option<DistanceRange>,

    pub gps: Option<GpsInfo>,
    pub maker_note: Option<MakerNote>,
    pub thumbnail: Option<EmbeddedThumbnail>,

    /// Entries no field claimed, kept so they can be written back or dropped
    ///
    /// Held in (directory, tag) order with at most one entry per pair; see
    /// `push_unknown_entry`.
    pub unknown_entries: Vec<RawEntry>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preferred capture date: the first DateTimeOriginal, else the first
    /// date of any kind
    pub fn date_time(&self) -> Option<&str> {
        self.date_times
            .iter()
            .find(|d| d.tag == tags::DATE_TIME_ORIGINAL)
            .or_else(|| self.date_times.first())
            .map(|d| d.value.as_str())
    }

    /// File a date occurrence at its (directory, tag) position
    ///
    /// Dates can only be written to IFD0, Exif or IFD1, so any other
    /// directory is filed under Exif. Returns false, leaving the list as it
    /// was, when `max` dates are already held or the pair is already present.
    pub fn push_date_time(&mut self, mut entry: DateTimeEntry, max: usize) -> bool {
        if !matches!(entry.directory, Directory::Ifd0 | Directory::Thumbnail) {
            entry.directory = Directory::Exif;
        }
        if self.date_times.len() >= max {
            return false;
        }
        let key = (entry.directory, entry.tag);
        match self
            .date_times
            .binary_search_by_key(&key, |d| (d.directory, d.tag))
        {
            Ok(_) => false,
            Err(index) => {
                self.date_times.insert(index, entry);
                true
            }
        }
    }

    /// Overwrite every recorded date occurrence, or add a DateTimeOriginal
    /// when there is none
    pub fn set_date_time(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.date_times.is_empty() {
            self.date_times.push(DateTimeEntry::new(
                Directory::Exif,
                tags::DATE_TIME_ORIGINAL,
                value,
            ));
        } else {
            for entry in &mut self.date_times {
                entry.value.clone_from(&value);
            }
        }
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation.and_then(Orientation::from_code)
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = Some(orientation.code());
    }

    /// Decimal location when both latitude and longitude are present;
    /// a missing altitude reads as 0
    pub fn location(&self) -> Option<GeoLocation> {
        let gps = self.gps.as_ref()?;
        Some(GeoLocation {
            latitude: gps.latitude_degrees()?,
            longitude: gps.longitude_degrees()?,
            altitude: gps.altitude_meters().unwrap_or(0.0),
        })
    }

    /// Replace the GPS position, keeping any other GPS entries
    pub fn set_location(&mut self, location: GeoLocation) {
        let gps = self.gps.get_or_insert_with(GpsInfo::default);
        gps.latitude_ref = Some(if location.latitude < 0.0 { 'S' } else { 'N' });
        gps.latitude = Some(CoordinateTriple::from_degrees(location.latitude));
        gps.longitude_ref = Some(if location.longitude < 0.0 { 'W' } else { 'E' });
        gps.longitude = Some(CoordinateTriple::from_degrees(location.longitude));
        gps.altitude_ref = Some(u8::from(location.altitude < 0.0));
        gps.altitude = Some(Rational::from_f64(location.altitude.abs()));
    }

    /// Drop the GPS sub-IFD and any GPS entries kept verbatim
    pub fn clear_location(&mut self) {
        self.gps = None;
        self.unknown_entries
            .retain(|e| e.directory != Directory::Gps);
    }

    /// F-number as a decimal
    pub fn aperture(&self) -> Option<f64> {
        self.f_number.map(Rational::to_f64)
    }

    pub fn exposure_seconds(&self) -> Option<f64> {
        self.exposure_time.map(Rational::to_f64)
    }

    pub fn focal_length_mm(&self) -> Option<f64> {
        self.focal_length.map(Rational::to_f64)
    }

    /// Sensor width derived from the focal-plane resolution and the Exif
    /// image width
    pub fn ccd_width_mm(&self) -> Option<f64> {
        let width = self.exif_image_width? as f64;
        let x_resolution = self.focal_plane_x_resolution?.to_f64();
        if x_resolution == 0.0 {
            return None;
        }
        let unit_mm = match self.focal_plane_resolution_unit.unwrap_or(2) {
            1 | 2 => 25.4,
            3 => 10.0,
            4 => 1.0,
            5 => 0.001,
            _ => return None,
        };
        Some(width * unit_mm / x_resolution)
    }

    /// File an unclaimed entry at its (directory, tag) position; false when
    /// that pair is already held
    pub fn push_unknown_entry(&mut self, entry: RawEntry) -> bool {
        let key = (entry.directory, entry.tag);
        match self
            .unknown_entries
            .binary_search_by_key(&key, |e| (e.directory, e.tag))
        {
            Ok(_) => false,
            Err(index) => {
                self.unknown_entries.insert(index, entry);
                true
            }
        }
    }

    /// Drop every entry no field claimed; true when any were removed
    pub fn remove_unknown_entries(&mut self) -> bool {
        let had_any = !self.unknown_entries.is_empty();
        self.unknown_entries.clear();
        had_any
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref make) = self.make {
            parts.push(make.clone());
        }
        if let Some(ref model) = self.model {
            parts.push(model.clone());
        }
        if let Some(dt) = self.date_time() {
            parts.push(dt.to_string());
        }
        if let Some(location) = self.location() {
            parts.push(format!("{:.5}, {:.5}", location.latitude, location.longitude));
        }
        if parts.is_empty() {
            write!(f, "(no metadata)")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}
