//! Exif directory writer
//!
//! [`TiffWriter`] lays a TIFF block out in two regions: every declared
//! directory, back to back, followed by a data region holding values too
//! large for their 4-byte slot. Slots that point into the data region are
//! recorded as patch requests and resolved by [`TiffWriter::serialize`], once
//! the size of the directory region is final.
//!
//! A vendor maker note that keeps its own directory is also rebased in
//! `serialize`, since its value offsets count from the TIFF header.
//!
//! The writer trusts its caller. A directory declared with N entries and
//! filled with fewer leaves zeroed slots behind.

use super::{
    maker_note, tags, Directory, ExifFormat, ENTRY_SIZE, TIFF_HEADER_SIZE, TIFF_MAGIC,
};
use crate::{
    byte_codec::{ByteBuilder, Endian},
    error::{Error, Result},
    metadata::MetadataRecord,
    options::WriteOptions,
    rational::{CoordinateTriple, Rational, SignedRational},
};
use log::debug;

/// Character-code prefix written ahead of UserComment text
const ASCII_CHARSET: &[u8; 8] = b"ASCII\0\0\0";

/// Owned value of one directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// NUL-terminated on disk
    Ascii(String),
    Byte(u8),
    Short(u16),
    Long(u32),
    Rational(Rational),
    SignedRational(SignedRational),
    Coordinate(CoordinateTriple),
    Undefined(Vec<u8>),
    /// Pre-encoded components, already in the writer's byte order
    Raw {
        format: ExifFormat,
        count: u32,
        data: Vec<u8>,
    },
}

impl EntryValue {
    pub fn format(&self) -> ExifFormat {
        match self {
            EntryValue::Ascii(_) => ExifFormat::Ascii,
            EntryValue::Byte(_) => ExifFormat::Byte,
            EntryValue::Short(_) => ExifFormat::Short,
            EntryValue::Long(_) => ExifFormat::Long,
            EntryValue::Rational(_) | EntryValue::Coordinate(_) => ExifFormat::Rational,
            EntryValue::SignedRational(_) => ExifFormat::SRational,
            EntryValue::Undefined(_) => ExifFormat::Undefined,
            EntryValue::Raw { format, .. } => *format,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            EntryValue::Ascii(text) => text.len() as u32 + 1,
            EntryValue::Coordinate(_) => 3,
            EntryValue::Undefined(data) => data.len() as u32,
            EntryValue::Raw { count, .. } => *count,
            _ => 1,
        }
    }

    fn encode(&self, order: Endian) -> Vec<u8> {
        let mut out = ByteBuilder::new(order);
        match self {
            EntryValue::Ascii(text) => {
                out.put_bytes(text.as_bytes());
                out.put_u8(0);
            }
            EntryValue::Byte(value) => out.put_u8(*value),
            EntryValue::Short(value) => out.put_u16(*value),
            EntryValue::Long(value) => out.put_u32(*value),
            EntryValue::Rational(value) => out.put_rational(*value),
            EntryValue::SignedRational(value) => out.put_signed_rational(*value),
            EntryValue::Coordinate(value) => out.put_coordinate_triple(*value),
            EntryValue::Undefined(data) | EntryValue::Raw { data, .. } => out.put_bytes(data),
        }
        out.into_inner()
    }
}

/// Position inside the data region, resolved to a header-relative offset
/// when the block is serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataOffset(usize);

#[derive(Debug)]
struct Patch {
    /// Slot position inside the directory region
    position: usize,
    target: DataOffset,
}

/// Blob in the data region whose directory is rebased on serialize
#[derive(Debug)]
struct Relocation {
    target: DataOffset,
    len: usize,
    /// Directory position inside the blob
    skip: usize,
}

/// Two-region TIFF block builder with a fixed byte order
#[derive(Debug)]
pub struct TiffWriter {
    order: Endian,
    directories: ByteBuilder,
    data: ByteBuilder,
    patches: Vec<Patch>,
    relocations: Vec<Relocation>,
}

impl TiffWriter {
    pub fn new(order: Endian) -> Self {
        Self {
            order,
            directories: ByteBuilder::new(order),
            data: ByteBuilder::new(order),
            patches: Vec::new(),
            relocations: Vec::new(),
        }
    }

    pub fn order(&self) -> Endian {
        self.order
    }

    /// Reserve a directory of `entry_count` slots and return its offset from
    /// the TIFF header
    ///
    /// The first directory declared is IFD0.
    pub fn declare_directory(&mut self, entry_count: u16) -> u32 {
        let base = TIFF_HEADER_SIZE + self.directories.len();
        self.directories.put_u16(entry_count);
        self.directories
            .put_zeros(entry_count as usize * ENTRY_SIZE + 4);
        base as u32
    }

    /// Entry count and region position of the directory declared at `base`
    fn directory_at(&self, base: u32) -> Result<(usize, usize)> {
        let start = (base as usize)
            .checked_sub(TIFF_HEADER_SIZE)
            .ok_or(Error::OutOfBounds {
                offset: base as usize,
                len: 2,
                size: self.directories.len(),
            })?;
        let count = self.order.read_u16(self.directories.as_slice(), start)? as usize;
        Ok((start, count))
    }

    fn slot(&self, base: u32, index: usize) -> Result<usize> {
        let (start, count) = self.directory_at(base)?;
        if index >= count {
            return Err(Error::OutOfBounds {
                offset: base as usize,
                len: (index + 1) * ENTRY_SIZE,
                size: count * ENTRY_SIZE,
            });
        }
        Ok(start + 2 + index * ENTRY_SIZE)
    }

    fn put_head(&mut self, position: usize, tag: u16, format: ExifFormat, count: u32) -> Result<()> {
        self.directories.patch_u16(position, tag)?;
        self.directories.patch_u16(position + 2, format.code())?;
        self.directories.patch_u32(position + 4, count)
    }

    /// Fill slot `index` of the directory at `base`
    ///
    /// Values over 4 bytes go to the data region and the slot receives
    /// their offset; smaller values are stored inline, zero padded.
    pub fn put_entry_at(&mut self, base: u32, index: usize, tag: u16, value: &EntryValue) -> Result<()> {
        let position = self.slot(base, index)?;
        self.put_head(position, tag, value.format(), value.count())?;
        let bytes = value.encode(self.order);
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            self.directories.patch_bytes(position + 8, &inline)
        } else {
            let target = self.append_data(&bytes);
            self.patches.push(Patch {
                position: position + 8,
                target,
            });
            Ok(())
        }
    }

    /// Fill slot `index` with a blob carrying a directory `skip` bytes in,
    /// held big endian with value offsets relative to the blob start
    ///
    /// The directory is put in the writer's byte order and its offsets moved
    /// to the blob's final position when the block is serialized.
    pub fn put_directory_blob_at(
        &mut self,
        base: u32,
        index: usize,
        tag: u16,
        blob: &[u8],
        skip: usize,
    ) -> Result<()> {
        if blob.len() <= 4 {
            // Too small to hold a directory
            return self.put_entry_at(base, index, tag, &EntryValue::Undefined(blob.to_vec()));
        }
        let position = self.slot(base, index)?;
        self.put_head(position, tag, ExifFormat::Undefined, blob.len() as u32)?;
        let target = self.append_data(blob);
        self.patches.push(Patch {
            position: position + 8,
            target,
        });
        self.relocations.push(Relocation {
            target,
            len: blob.len(),
            skip,
        });
        Ok(())
    }

    /// Fill a pointer slot with an offset already known to the caller, such
    /// as the base of another declared directory
    pub fn put_offset_entry_at(&mut self, base: u32, index: usize, tag: u16, target: u32) -> Result<()> {
        let position = self.slot(base, index)?;
        self.put_head(position, tag, ExifFormat::Long, 1)?;
        self.directories.patch_u32(position + 8, target)
    }

    /// Fill a pointer slot with the final offset of bytes in the data region
    pub fn put_data_offset_entry_at(
        &mut self,
        base: u32,
        index: usize,
        tag: u16,
        target: DataOffset,
    ) -> Result<()> {
        let position = self.slot(base, index)?;
        self.put_head(position, tag, ExifFormat::Long, 1)?;
        self.patches.push(Patch {
            position: position + 8,
            target,
        });
        Ok(())
    }

    /// Append bytes to the data region, keeping it word aligned
    pub fn append_data(&mut self, bytes: &[u8]) -> DataOffset {
        let at = DataOffset(self.data.len());
        self.data.put_bytes(bytes);
        if self.data.len() % 2 == 1 {
            self.data.put_u8(0);
        }
        at
    }

    /// Link the directory at `base` to the one at `next`
    pub fn set_next_directory(&mut self, base: u32, next: u32) -> Result<()> {
        let (start, count) = self.directory_at(base)?;
        self.directories
            .patch_u32(start + 2 + count * ENTRY_SIZE, next)
    }

    /// Header, directories in declaration order, then the data region
    pub fn serialize(mut self) -> Result<Vec<u8>> {
        let data_base = TIFF_HEADER_SIZE + self.directories.len();
        let total = data_base + self.data.len();
        if u32::try_from(total).is_err() {
            return Err(Error::DataTooLarge {
                size: total,
                max: u32::MAX as usize,
            });
        }
        for patch in &self.patches {
            self.directories
                .patch_u32(patch.position, (data_base + patch.target.0) as u32)?;
        }
        for relocation in &self.relocations {
            let start = relocation.target.0;
            let size = self.data.len();
            let blob = self
                .data
                .as_mut_slice()
                .get_mut(start..start + relocation.len)
                .ok_or(Error::OutOfBounds {
                    offset: start,
                    len: relocation.len,
                    size,
                })?;
            maker_note::relocate_directory(
                blob,
                relocation.skip,
                Endian::Big,
                self.order,
                0,
                (data_base + start) as u32,
            )?;
        }

        let mut out = ByteBuilder::new(self.order);
        out.put_bytes(self.order.order_mark());
        out.put_u16(TIFF_MAGIC);
        out.put_u32(TIFF_HEADER_SIZE as u32);
        out.put_bytes(self.directories.as_slice());
        out.put_bytes(self.data.as_slice());
        Ok(out.into_inner())
    }
}

/// What goes into one slot once directory bases are known
#[derive(Debug)]
enum Pending {
    Value(EntryValue),
    Pointer(Directory),
    Thumbnail,
    /// Maker note whose directory needs rebasing
    VendorDirectory { data: Vec<u8>, skip: usize },
}

#[derive(Debug)]
struct Planned {
    tag: u16,
    item: Pending,
}

#[derive(Debug, Default)]
struct Plan {
    ifd0: Vec<Planned>,
    exif: Vec<Planned>,
    gps: Vec<Planned>,
    thumbnail: Vec<Planned>,
}

impl Plan {
    fn list(&mut self, directory: Directory) -> Option<&mut Vec<Planned>> {
        match directory {
            Directory::Ifd0 => Some(&mut self.ifd0),
            Directory::Exif => Some(&mut self.exif),
            Directory::Gps => Some(&mut self.gps),
            Directory::Thumbnail => Some(&mut self.thumbnail),
            Directory::MakerNote => None,
        }
    }

    fn push(&mut self, directory: Directory, tag: u16, item: Pending) {
        if let Some(list) = self.list(directory) {
            list.push(Planned { tag, item });
        }
    }

    fn value(&mut self, directory: Directory, tag: u16, value: Option<EntryValue>) {
        if let Some(value) = value {
            self.push(directory, tag, Pending::Value(value));
        }
    }
}

fn ascii(text: &Option<String>) -> Option<EntryValue> {
    text.clone().map(EntryValue::Ascii)
}

fn plan(record: &MetadataRecord, options: &WriteOptions) -> Plan {
    use Directory::{Exif, Gps, Ifd0, Thumbnail};

    let mut plan = Plan::default();
    let short = |v: Option<u16>| v.map(EntryValue::Short);
    let rational = |v: Option<Rational>| v.map(EntryValue::Rational);

    plan.value(Ifd0, tags::IMAGE_DESCRIPTION, ascii(&record.image_description));
    plan.value(Ifd0, tags::MAKE, ascii(&record.make));
    plan.value(Ifd0, tags::MODEL, ascii(&record.model));
    plan.value(Ifd0, tags::ORIENTATION, short(record.orientation));
    plan.value(Ifd0, tags::X_RESOLUTION, rational(record.x_resolution));
    plan.value(Ifd0, tags::Y_RESOLUTION, rational(record.y_resolution));
    plan.value(Ifd0, tags::RESOLUTION_UNIT, short(record.resolution_unit));
    plan.value(Ifd0, tags::SOFTWARE, ascii(&record.software));
    plan.value(Ifd0, tags::ARTIST, ascii(&record.artist));
    plan.value(Ifd0, tags::COPYRIGHT, ascii(&record.copyright));

    plan.value(Exif, tags::EXPOSURE_TIME, rational(record.exposure_time));
    plan.value(Exif, tags::F_NUMBER, rational(record.f_number));
    plan.value(Exif, tags::EXPOSURE_PROGRAM, short(record.exposure_program.map(|p| p.code())));
    plan.value(Exif, tags::ISO_SPEED, short(record.iso));
    plan.value(
        Exif,
        tags::EXPOSURE_BIAS,
        record.exposure_bias.map(EntryValue::SignedRational),
    );
    plan.value(Exif, tags::SUBJECT_DISTANCE, rational(record.subject_distance));
    plan.value(Exif, tags::METERING_MODE, short(record.metering_mode.map(|m| m.code())));
    plan.value(Exif, tags::LIGHT_SOURCE, short(record.light_source.map(|l| l.code())));
    plan.value(Exif, tags::FLASH, short(record.flash));
    plan.value(Exif, tags::FOCAL_LENGTH, rational(record.focal_length));
    if let Some(note) = &record.maker_note {
        let item = match note.relocatable_directory() {
            Some(skip) => Pending::VendorDirectory {
                data: note.data.clone(),
                skip,
            },
            None => Pending::Value(EntryValue::Undefined(note.data.clone())),
        };
        plan.push(Exif, tags::MAKER_NOTE, item);
    }
    plan.value(
        Exif,
        tags::USER_COMMENT,
        record.user_comment.as_ref().map(|text| {
            let mut data = ASCII_CHARSET.to_vec();
            data.extend_from_slice(text.as_bytes());
            EntryValue::Undefined(data)
        }),
    );
    plan.value(Exif, tags::EXIF_IMAGE_WIDTH, record.exif_image_width.map(EntryValue::Long));
    plan.value(Exif, tags::EXIF_IMAGE_LENGTH, record.exif_image_length.map(EntryValue::Long));
    plan.value(
        Exif,
        tags::FOCAL_PLANE_X_RESOLUTION,
        rational(record.focal_plane_x_resolution),
    );
    plan.value(
        Exif,
        tags::FOCAL_PLANE_RESOLUTION_UNIT,
        short(record.focal_plane_resolution_unit),
    );
    plan.value(Exif, tags::EXPOSURE_MODE, short(record.exposure_mode.map(|m| m.code())));
    plan.value(Exif, tags::WHITE_BALANCE, short(record.white_balance.map(|w| w.code())));
    plan.value(Exif, tags::DIGITAL_ZOOM_RATIO, rational(record.digital_zoom_ratio));
    plan.value(Exif, tags::FOCAL_LENGTH_35MM, short(record.focal_length_35mm));
    plan.value(
        Exif,
        tags::SUBJECT_DISTANCE_RANGE,
        short(record.distance_range.map(|d| d.code())),
    );

    for date in &record.date_times {
        let directory = match date.directory {
            Ifd0 | Exif | Thumbnail => date.directory,
            Gps | Directory::MakerNote => Exif,
        };
        plan.value(directory, date.tag, Some(EntryValue::Ascii(date.value.clone())));
    }

    if let Some(gps) = &record.gps {
        let reference = |r: Option<char>| r.map(|c| EntryValue::Ascii(c.to_string()));
        plan.value(Gps, tags::GPS_LATITUDE_REF, reference(gps.latitude_ref));
        plan.value(Gps, tags::GPS_LATITUDE, gps.latitude.map(EntryValue::Coordinate));
        plan.value(Gps, tags::GPS_LONGITUDE_REF, reference(gps.longitude_ref));
        plan.value(Gps, tags::GPS_LONGITUDE, gps.longitude.map(EntryValue::Coordinate));
        plan.value(Gps, tags::GPS_ALTITUDE_REF, gps.altitude_ref.map(EntryValue::Byte));
        plan.value(Gps, tags::GPS_ALTITUDE, rational(gps.altitude));
    }

    if options.include_thumbnail {
        if let Some(thumbnail) = &record.thumbnail {
            plan.push(Thumbnail, tags::JPEG_INTERCHANGE_FORMAT, Pending::Thumbnail);
            plan.value(
                Thumbnail,
                tags::JPEG_INTERCHANGE_FORMAT_LENGTH,
                Some(EntryValue::Long(thumbnail.len() as u32)),
            );
        }
    }

    if options.include_unknown_entries {
        for entry in &record.unknown_entries {
            plan.value(
                entry.directory,
                entry.tag,
                Some(EntryValue::Raw {
                    format: entry.format,
                    count: entry.count,
                    data: entry.value_in(options.byte_order),
                }),
            );
        }
    }
    if !options.include_thumbnail {
        plan.thumbnail.clear();
    }

    if !plan.exif.is_empty() {
        plan.push(Ifd0, tags::EXIF_IFD_POINTER, Pending::Pointer(Exif));
    }
    if record.gps.is_some() || !plan.gps.is_empty() {
        plan.push(Ifd0, tags::GPS_IFD_POINTER, Pending::Pointer(Gps));
    }

    for list in [
        &mut plan.ifd0,
        &mut plan.exif,
        &mut plan.gps,
        &mut plan.thumbnail,
    ] {
        // Stable: a field wins over an overflow entry with the same tag
        list.sort_by_key(|p| p.tag);
        let planned = list.len();
        list.dedup_by_key(|p| p.tag);
        if list.len() < planned {
            debug!("dropped {} entries repeating a tag", planned - list.len());
        }
    }
    plan
}

/// Build a complete TIFF block (no `Exif\0\0` signature) from `record`
pub fn encode(record: &MetadataRecord, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut plan = plan(record, options);
    let mut writer = TiffWriter::new(options.byte_order);

    let mut layout: Vec<(Directory, u32, Vec<Planned>)> = Vec::new();
    for (directory, entries) in [
        (Directory::Ifd0, std::mem::take(&mut plan.ifd0)),
        (Directory::Exif, std::mem::take(&mut plan.exif)),
        (Directory::Gps, std::mem::take(&mut plan.gps)),
        (Directory::Thumbnail, std::mem::take(&mut plan.thumbnail)),
    ] {
        let keep = directory == Directory::Ifd0
            || !entries.is_empty()
            || (directory == Directory::Gps && record.gps.is_some());
        if !keep {
            continue;
        }
        let count = u16::try_from(entries.len()).map_err(|_| Error::DataTooLarge {
            size: entries.len(),
            max: u16::MAX as usize,
        })?;
        let base = writer.declare_directory(count);
        debug!("{} directory at {}: {} entries", directory, base, count);
        layout.push((directory, base, entries));
    }
    let base_of = |wanted: Directory| {
        layout
            .iter()
            .find(|(directory, _, _)| *directory == wanted)
            .map(|(_, base, _)| *base)
    };

    for (_, base, entries) in &layout {
        for (index, planned) in entries.iter().enumerate() {
            match &planned.item {
                Pending::Value(value) => writer.put_entry_at(*base, index, planned.tag, value)?,
                Pending::Pointer(target) => {
                    let target = base_of(*target).ok_or_else(|| Error::InvalidSegment {
                        offset: *base as usize,
                        reason: format!("{} directory was not declared", target),
                    })?;
                    writer.put_offset_entry_at(*base, index, planned.tag, target)?;
                }
                Pending::Thumbnail => {
                    let data = record
                        .thumbnail
                        .as_ref()
                        .map(|t| t.data.as_slice())
                        .unwrap_or_default();
                    let at = writer.append_data(data);
                    writer.put_data_offset_entry_at(*base, index, planned.tag, at)?;
                }
                Pending::VendorDirectory { data, skip } => {
                    writer.put_directory_blob_at(*base, index, planned.tag, data, *skip)?
                }
            }
        }
    }

    if let (Some(ifd0), Some(thumbnail)) = (base_of(Directory::Ifd0), base_of(Directory::Thumbnail)) {
        writer.set_next_directory(ifd0, thumbnail)?;
    }
    writer.serialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            DateTimeEntry, DistanceRange, ExposureMode, ExposureProgram, GpsInfo, LightSource,
            MeteringMode, WhiteBalance,
        },
        test_utils::{FixtureEntry, TiffFixture},
        thumbnail::EmbeddedThumbnail,
        tiff::{
            maker_note::{MakerNote, Vendor},
            reader, RawEntry,
        },
    };

    fn sample_record() -> MetadataRecord {
        MetadataRecord {
            make: Some("FUJIFILM".into()),
            model: Some("X-T5".into()),
            image_description: Some("harbour at dusk".into()),
            software: Some("exif-io".into()),
            artist: Some("A. Photographer".into()),
            copyright: Some("(c) 2024".into()),
            user_comment: Some("tripod".into()),
            date_times: vec![
                DateTimeEntry::new(Directory::Ifd0, tags::DATE_TIME, "2024:05:06 07:08:09"),
                DateTimeEntry::new(
                    Directory::Exif,
                    tags::DATE_TIME_ORIGINAL,
                    "2024:05:06 07:08:00",
                ),
                DateTimeEntry::new(
                    Directory::Exif,
                    tags::DATE_TIME_DIGITIZED,
                    "2024:05:06 07:08:01",
                ),
            ],
            orientation: Some(6),
            x_resolution: Some(Rational::new(72, 1)),
            y_resolution: Some(Rational::new(72, 1)),
            resolution_unit: Some(2),
            exposure_time: Some(Rational::new(1, 250)),
            f_number: Some(Rational::new(56, 10)),
            exposure_program: Some(ExposureProgram::AperturePriority),
            iso: Some(800),
            exposure_bias: Some(SignedRational::new(-2, 3)),
            subject_distance: Some(Rational::new(35, 10)),
            metering_mode: Some(MeteringMode::Spot),
            light_source: Some(LightSource::Daylight),
            flash: Some(16),
            focal_length: Some(Rational::new(50, 1)),
            exif_image_width: Some(8192),
            exif_image_length: Some(5464),
            focal_plane_x_resolution: Some(Rational::new(8192_000, 36_000)),
            focal_plane_resolution_unit: Some(4),
            exposure_mode: Some(ExposureMode::Manual),
            white_balance: Some(WhiteBalance::Auto),
            digital_zoom_ratio: Some(Rational::new(1, 1)),
            focal_length_35mm: Some(50),
            distance_range: Some(DistanceRange::Distant),
            gps: Some(GpsInfo {
                latitude_ref: Some('S'),
                latitude: Some(CoordinateTriple::new(
                    Rational::new(33, 1),
                    Rational::new(51, 1),
                    Rational::new(24_402, 1000),
                )),
                longitude_ref: Some('E'),
                longitude: Some(CoordinateTriple::new(
                    Rational::new(151, 1),
                    Rational::new(12, 1),
                    Rational::new(55_069, 1000),
                )),
                altitude_ref: Some(0),
                altitude: Some(Rational::new(125, 10)),
            }),
            maker_note: Some(MakerNote::opaque(b"opaque vendor data".to_vec())),
            thumbnail: Some(EmbeddedThumbnail::new(vec![0xFF, 0xD8, 0xFF, 0xD9, 0x00])),
            unknown_entries: vec![RawEntry {
                directory: Directory::Exif,
                tag: tags::COLOR_SPACE,
                format: ExifFormat::Short,
                count: 1,
                value: vec![0x00, 0x01],
            }],
        }
    }

    #[test]
    fn test_string_goes_to_data_region() {
        let mut writer = TiffWriter::new(Endian::Big);
        let base = writer.declare_directory(1);
        assert_eq!(base, 8);
        writer
            .put_entry_at(base, 0, tags::MAKE, &EntryValue::Ascii("Canon".into()))
            .unwrap();
        let block = writer.serialize().unwrap();

        // header 8 + count 2 + entry 12 + next 4
        let data_start = 8 + 2 + 12 + 4;
        let slot = 8 + 2;
        assert_eq!(&block[slot..slot + 2], &[0x01, 0x0F]);
        assert_eq!(&block[slot + 2..slot + 4], &[0x00, 0x02]);
        assert_eq!(&block[slot + 4..slot + 8], &[0, 0, 0, 6]);
        assert_eq!(&block[slot + 8..slot + 12], &(data_start as u32).to_be_bytes());
        assert_eq!(&block[data_start..data_start + 6], b"Canon\0");

        let record = reader::decode(&block, 0).unwrap();
        assert_eq!(record.make.as_deref(), Some("Canon"));
    }

    #[test]
    fn test_small_values_inline() {
        let mut writer = TiffWriter::new(Endian::Little);
        let base = writer.declare_directory(2);
        writer
            .put_entry_at(base, 0, tags::ORIENTATION, &EntryValue::Short(8))
            .unwrap();
        writer
            .put_entry_at(base, 1, tags::MODEL, &EntryValue::Ascii("X1".into()))
            .unwrap();
        let block = writer.serialize().unwrap();
        assert_eq!(block.len(), 8 + 2 + 24 + 4);
        assert_eq!(&block[18..22], &[8, 0, 0, 0]);
        assert_eq!(&block[30..34], b"X1\0\0");
    }

    #[test]
    fn test_slot_outside_declared_directory() {
        let mut writer = TiffWriter::new(Endian::Big);
        let base = writer.declare_directory(1);
        assert!(matches!(
            writer.put_entry_at(base, 1, tags::MAKE, &EntryValue::Short(1)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(writer.put_offset_entry_at(4, 0, tags::MAKE, 0).is_err());
    }

    #[test]
    fn test_directories_and_data_offsets() {
        let mut writer = TiffWriter::new(Endian::Big);
        let ifd0 = writer.declare_directory(1);
        let sub = writer.declare_directory(1);
        assert_eq!(sub, 8 + 2 + 12 + 4);
        let at = writer.append_data(&[1, 2, 3]);
        writer
            .put_offset_entry_at(ifd0, 0, tags::EXIF_IFD_POINTER, sub)
            .unwrap();
        writer
            .put_data_offset_entry_at(sub, 0, tags::JPEG_INTERCHANGE_FORMAT, at)
            .unwrap();
        writer.set_next_directory(ifd0, sub).unwrap();
        let block = writer.serialize().unwrap();

        let data_start = (8 + 2 * (2 + 12 + 4)) as u32;
        let order = Endian::Big;
        assert_eq!(order.read_u32(&block, 8 + 2 + 8).unwrap(), sub);
        assert_eq!(order.read_u32(&block, 8 + 2 + 12).unwrap(), sub);
        let pointer = order.read_u32(&block, sub as usize + 2 + 8).unwrap();
        assert_eq!(pointer, data_start);
        // Padded to an even length
        assert_eq!(block.len(), data_start as usize + 4);
    }

    #[test]
    fn test_round_trip_both_byte_orders() {
        let record = sample_record();
        for order in [Endian::Big, Endian::Little] {
            let options = WriteOptions::new().with_byte_order(order);
            let block = encode(&record, &options).unwrap();
            assert_eq!(&block[0..2], order.order_mark());

            let mut reader = reader::ExifReader::default();
            let decoded = reader.decode(&block, 0).unwrap();
            assert!(reader.issues().is_empty(), "{:?}", reader.issues());
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let record = sample_record();
        let options = WriteOptions::default();
        let first = encode(&record, &options).unwrap();
        let second = encode(&record, &options).unwrap();
        assert_eq!(first, second);

        let again = encode(&reader::decode(&first, 0).unwrap(), &options).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_byte_order_conversion_keeps_unknown_values() {
        let record = sample_record();
        let little = encode(&record, &WriteOptions::new().with_byte_order(Endian::Little)).unwrap();
        let decoded = reader::decode(&little, 0).unwrap();
        let big = encode(&decoded, &WriteOptions::new()).unwrap();
        assert_eq!(reader::decode(&big, 0).unwrap(), record);
    }

    #[test]
    fn test_optional_parts() {
        let record = sample_record();
        let options = WriteOptions::new()
            .without_thumbnail()
            .without_unknown_entries();
        let decoded = reader::decode(&encode(&record, &options).unwrap(), 0).unwrap();
        assert!(decoded.thumbnail.is_none());
        assert!(decoded.unknown_entries.is_empty());
        assert_eq!(decoded.make, record.make);
    }

    #[test]
    fn test_empty_record() {
        let block = encode(&MetadataRecord::default(), &WriteOptions::default()).unwrap();
        assert_eq!(block, b"MM\0\x2A\0\0\0\x08\0\0\0\0\0\0");
        assert_eq!(reader::decode(&block, 0).unwrap(), MetadataRecord::default());
    }

    #[test]
    fn test_field_wins_over_duplicate_unknown_entry() {
        let mut record = MetadataRecord {
            make: Some("Fujifilm".into()),
            ..Default::default()
        };
        record.unknown_entries.push(RawEntry {
            directory: Directory::Ifd0,
            tag: tags::MAKE,
            format: ExifFormat::Ascii,
            count: 4,
            value: b"Bad\0".to_vec(),
        });
        let decoded = reader::decode(&encode(&record, &WriteOptions::default()).unwrap(), 0).unwrap();
        assert_eq!(decoded.make.as_deref(), Some("Fujifilm"));
        assert!(decoded.unknown_entries.is_empty());
    }

    /// Canon directory addressed from the TIFF header, with one ASCII value
    /// stored out of line
    fn canon_tiff(order: Endian) -> Vec<u8> {
        let mut tiff = TiffFixture::new(order);
        let ifd0 = tiff.reserve_directory(2);
        let exif = tiff.reserve_directory(1);

        let at = tiff.len() as u32;
        let mut note = ByteBuilder::new(order);
        note.put_u16(1);
        note.put_u16(0x0006);
        note.put_u16(ExifFormat::Ascii.code());
        note.put_u32(12);
        note.put_u32(at + 2 + 12 + 4);
        note.put_u32(0);
        note.put_bytes(b"Canon EOS R\0");
        let note = note.into_inner();
        assert_eq!(tiff.append(&note), at);

        tiff.fill_directory(
            exif,
            &[FixtureEntry::long(tags::MAKER_NOTE, at)
                .with_format(ExifFormat::Undefined.code())
                .with_count(note.len() as u32)],
            0,
        );
        tiff.fill_directory(
            ifd0,
            &[
                FixtureEntry::ascii(tags::MAKE, "Canon"),
                FixtureEntry::long(tags::EXIF_IFD_POINTER, exif),
            ],
            0,
        );
        tiff.finish()
    }

    #[test]
    fn test_canon_maker_note_survives_relocation() {
        for source in [Endian::Big, Endian::Little] {
            let original = reader::decode(&canon_tiff(source), 0).unwrap();
            let note = original.maker_note.as_ref().unwrap();
            assert_eq!(note.vendor, Vendor::Canon);
            assert_eq!(note.entry(0x0006).unwrap().value, b"Canon EOS R\0");

            for order in [Endian::Big, Endian::Little] {
                let options = WriteOptions::new().with_byte_order(order);
                let block = encode(&original, &options).unwrap();
                let mut reader = reader::ExifReader::default();
                let decoded = reader.decode(&block, 0).unwrap();
                assert!(reader.issues().is_empty(), "{:?}", reader.issues());
                assert_eq!(decoded, original);

                // The value offset inside the note follows the note
                let text = block
                    .windows(12)
                    .position(|w| w == b"Canon EOS R\0")
                    .unwrap();
                let note_at = text - (2 + 12 + 4);
                assert_eq!(
                    order.read_u32(&block, note_at + 2 + 8).unwrap() as usize,
                    text
                );
            }
        }
    }

    #[test]
    fn test_dates_and_unknown_entries_round_trip_in_any_push_order() {
        let mut record = MetadataRecord::new();
        assert!(record.push_date_time(
            DateTimeEntry::new(Directory::Exif, tags::DATE_TIME_ORIGINAL, "2024:05:06 07:08:00"),
            10
        ));
        assert!(record.push_date_time(
            DateTimeEntry::new(Directory::Ifd0, tags::DATE_TIME, "2024:05:06 07:08:09"),
            10
        ));
        assert!(!record.push_date_time(
            DateTimeEntry::new(Directory::Exif, tags::DATE_TIME_ORIGINAL, "2000:01:01 00:00:00"),
            10
        ));
        assert!(record.push_unknown_entry(RawEntry {
            directory: Directory::Exif,
            tag: tags::COLOR_SPACE,
            format: ExifFormat::Short,
            count: 1,
            value: vec![0x00, 0x01],
        }));
        // YCbCrPositioning
        assert!(record.push_unknown_entry(RawEntry {
            directory: Directory::Ifd0,
            tag: 0x0213,
            format: ExifFormat::Short,
            count: 1,
            value: vec![0x00, 0x02],
        }));

        for order in [Endian::Big, Endian::Little] {
            let options = WriteOptions::new().with_byte_order(order);
            let decoded = reader::decode(&encode(&record, &options).unwrap(), 0).unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn test_text_round_trips_verbatim() {
        let record = MetadataRecord {
            make: Some("  Canon  ".into()),
            model: Some(String::new()),
            artist: Some("A. Photographer ".into()),
            user_comment: Some(String::new()),
            ..Default::default()
        };
        for order in [Endian::Big, Endian::Little] {
            let options = WriteOptions::new().with_byte_order(order);
            let decoded = reader::decode(&encode(&record, &options).unwrap(), 0).unwrap();
            assert_eq!(decoded, record);
        }
    }
}
