//! Exif directory reader
//!
//! Walks IFD0, the Exif and GPS sub-directories, the thumbnail directory and
//! any vendor maker-note directory, routing recognised tags into a
//! [`MetadataRecord`]. Every offset is treated as untrusted: reads are
//! bounds-checked, sub-directory depth is capped, and failures below IFD0 are
//! recorded on the reader instead of aborting the decode.

use super::{
    describe_tag,
    maker_note::{self, Layout, MakerNote},
    tags, Directory, ExifFormat, RawEntry, ENTRY_SIZE, TIFF_HEADER_SIZE, TIFF_MAGIC,
};
use crate::{
    byte_codec::Endian,
    error::{Error, Result},
    metadata::{
        DateTimeEntry, DistanceRange, ExposureMode, ExposureProgram, GpsInfo, LightSource,
        MeteringMode, MetadataRecord, WhiteBalance,
    },
    options::ReadOptions,
    rational::{CoordinateTriple, Rational, SignedRational},
    thumbnail::EmbeddedThumbnail,
};
use log::{debug, trace, warn};

/// Parse a TIFF header, returning its byte order and IFD0 offset
pub(crate) fn read_header(data: &[u8]) -> Result<(Endian, usize)> {
    if data.len() < TIFF_HEADER_SIZE {
        return Err(Error::BadTiffHeader(format!(
            "{} bytes, need at least {}",
            data.len(),
            TIFF_HEADER_SIZE
        )));
    }
    let order = Endian::from_order_mark(&data[0..2]).ok_or_else(|| {
        Error::BadTiffHeader(format!(
            "unknown byte order mark {:02X}{:02X}",
            data[0], data[1]
        ))
    })?;
    let magic = order.read_u16(data, 2)?;
    if magic != TIFF_MAGIC {
        return Err(Error::BadTiffHeader(format!("magic 0x{:04X}", magic)));
    }
    Ok((order, order.read_u32(data, 4)? as usize))
}

/// Decode a TIFF block with default options
///
/// `tiff_offset` is the position of the TIFF header inside `buffer`; every
/// offset in the block is relative to it.
pub fn decode(buffer: &[u8], tiff_offset: usize) -> Result<MetadataRecord> {
    ExifReader::default().decode(buffer, tiff_offset)
}

/// Configurable Exif decoder that keeps the non-fatal failures of its last
/// decode
#[derive(Debug, Default)]
pub struct ExifReader {
    options: ReadOptions,
    issues: Vec<Error>,
}

impl ExifReader {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            issues: Vec::new(),
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Failures recovered during the last decode, in the order they occurred
    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.issues)
    }

    /// Decode the TIFF block starting at `tiff_offset`
    ///
    /// A bad header or an unreadable IFD0 fails the call. Failures inside
    /// sub-directories, single entries, the maker note or the thumbnail are
    /// collected in [`issues`](Self::issues) and decoding continues.
    pub fn decode(&mut self, buffer: &[u8], tiff_offset: usize) -> Result<MetadataRecord> {
        self.issues.clear();
        let data = buffer.get(tiff_offset..).ok_or_else(|| {
            Error::BadTiffHeader(format!(
                "header offset {} beyond buffer of {} bytes",
                tiff_offset,
                buffer.len()
            ))
        })?;
        let (order, ifd0) = read_header(data)?;
        debug!("TIFF header: {:?} endian, IFD0 at {}", order, ifd0);

        let root = Block { data, order };
        let mut walk = Walk::new(&self.options);
        let outcome = walk.directory(root, ifd0, Directory::Ifd0, 0);
        if outcome.is_ok() {
            walk.finish(root);
        }
        self.issues = walk.issues;
        outcome.map(|()| walk.record)
    }
}

/// A TIFF structure and the byte order of its offsets and values
#[derive(Debug, Clone, Copy)]
struct Block<'a> {
    data: &'a [u8],
    order: Endian,
}

/// One 12-byte entry with its value location resolved and bounds-checked
#[derive(Debug, Clone, Copy)]
struct DirectoryEntry {
    tag: u16,
    format: ExifFormat,
    count: u32,
    value_offset: usize,
    byte_count: usize,
}

struct DirectoryTable {
    entries: Vec<Result<DirectoryEntry>>,
    next: usize,
}

/// Text up to the first NUL, kept as stored
fn clean_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl<'a> Block<'a> {
    fn read_directory(&self, offset: usize, max_entries: usize) -> Result<DirectoryTable> {
        let count = self.order.read_u16(self.data, offset)? as usize;
        if count > max_entries {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!("directory claims {} entries (max {})", count, max_entries),
            });
        }
        let table_len = 2 + count * ENTRY_SIZE;
        if offset + table_len > self.data.len() {
            return Err(Error::OutOfBounds {
                offset,
                len: table_len,
                size: self.data.len(),
            });
        }
        let entries = (0..count)
            .map(|i| self.read_entry(offset + 2 + i * ENTRY_SIZE))
            .collect();
        // A truncated next pointer ends the chain
        let next = self
            .order
            .read_u32(self.data, offset + table_len)
            .map(|n| n as usize)
            .unwrap_or(0);
        Ok(DirectoryTable { entries, next })
    }

    fn read_entry(&self, position: usize) -> Result<DirectoryEntry> {
        let tag = self.order.read_u16(self.data, position)?;
        let code = self.order.read_u16(self.data, position + 2)?;
        let format = ExifFormat::from_code(code).ok_or(Error::UnsupportedFormat {
            tag,
            format: code,
        })?;
        let count = self.order.read_u32(self.data, position + 4)?;
        let byte_count = count as u64 * format.size() as u64;
        if byte_count > self.data.len() as u64 {
            return Err(Error::OutOfBounds {
                offset: position,
                len: usize::try_from(byte_count).unwrap_or(usize::MAX),
                size: self.data.len(),
            });
        }
        let byte_count = byte_count as usize;
        let value_offset = if byte_count <= 4 {
            position + 8
        } else {
            self.order.read_u32(self.data, position + 8)? as usize
        };
        if value_offset
            .checked_add(byte_count)
            .map_or(true, |end| end > self.data.len())
        {
            return Err(Error::OutOfBounds {
                offset: value_offset,
                len: byte_count,
                size: self.data.len(),
            });
        }
        Ok(DirectoryEntry {
            tag,
            format,
            count,
            value_offset,
            byte_count,
        })
    }

    fn bytes(&self, entry: &DirectoryEntry) -> &'a [u8] {
        self.data
            .get(entry.value_offset..entry.value_offset + entry.byte_count)
            .unwrap_or(&[])
    }

    /// First component of any numeric format, truncated to an integer
    fn integer(&self, entry: &DirectoryEntry) -> Result<i64> {
        let (data, order, at) = (self.data, self.order, entry.value_offset);
        Ok(match entry.format {
            ExifFormat::Byte | ExifFormat::Ascii | ExifFormat::Undefined => {
                i64::from(order.read_u8(data, at)?)
            }
            ExifFormat::SByte => i64::from(order.read_u8(data, at)? as i8),
            ExifFormat::Short => i64::from(order.read_u16(data, at)?),
            ExifFormat::SShort => i64::from(order.read_i16(data, at)?),
            ExifFormat::Long => i64::from(order.read_u32(data, at)?),
            ExifFormat::SLong => i64::from(order.read_i32(data, at)?),
            ExifFormat::Rational => order.read_rational(data, at)?.to_f64() as i64,
            ExifFormat::SRational => order.read_signed_rational(data, at)?.to_f64() as i64,
            ExifFormat::Float => order.read_f32(data, at)? as i64,
            ExifFormat::Double => order.read_f64(data, at)? as i64,
        })
    }

    fn unsigned(&self, entry: &DirectoryEntry) -> Result<u32> {
        Ok(self.integer(entry)?.clamp(0, i64::from(u32::MAX)) as u32)
    }

    fn short(&self, entry: &DirectoryEntry) -> Result<u16> {
        Ok(self.integer(entry)?.clamp(0, i64::from(u16::MAX)) as u16)
    }

    fn rational(&self, entry: &DirectoryEntry) -> Result<Rational> {
        match entry.format {
            ExifFormat::Rational => self.order.read_rational(self.data, entry.value_offset),
            ExifFormat::SRational => {
                let r = self
                    .order
                    .read_signed_rational(self.data, entry.value_offset)?;
                Ok(Rational::new(
                    r.numerator.unsigned_abs(),
                    r.denominator.unsigned_abs(),
                ))
            }
            _ => Ok(Rational::new(self.unsigned(entry)?, 1)),
        }
    }

    fn signed_rational(&self, entry: &DirectoryEntry) -> Result<SignedRational> {
        match entry.format {
            ExifFormat::SRational => self
                .order
                .read_signed_rational(self.data, entry.value_offset),
            ExifFormat::Rational => {
                let r = self.order.read_rational(self.data, entry.value_offset)?;
                Ok(SignedRational::new(
                    r.numerator.min(i32::MAX as u32) as i32,
                    r.denominator.min(i32::MAX as u32) as i32,
                ))
            }
            _ => {
                let value = self
                    .integer(entry)?
                    .clamp(i64::from(i32::MIN), i64::from(i32::MAX));
                Ok(SignedRational::new(value as i32, 1))
            }
        }
    }

    fn coordinate(&self, entry: &DirectoryEntry) -> Result<CoordinateTriple> {
        self.order
            .read_coordinate_triple(self.data, entry.value_offset)
    }

    fn text(&self, entry: &DirectoryEntry) -> String {
        clean_text(self.bytes(entry))
    }

    /// UserComment text without its 8-byte character-code prefix
    fn user_comment(&self, entry: &DirectoryEntry) -> Option<String> {
        let bytes = self.bytes(entry);
        if bytes.len() < 8 {
            return Some(clean_text(bytes));
        }
        let (code, body) = bytes.split_at(8);
        match code {
            b"UNICODE\0" => {
                let units: Vec<u16> = body
                    .chunks_exact(2)
                    .map(|unit| self.order.read_u16(unit, 0))
                    .collect::<Result<_>>()
                    .ok()?;
                let text = String::from_utf16_lossy(&units);
                Some(clean_text(text.as_bytes()))
            }
            b"ASCII\0\0\0" | b"\0\0\0\0\0\0\0\0" => Some(clean_text(body)),
            _ => Some(clean_text(bytes)),
        }
    }

    /// Verbatim copy with multi-byte units re-ordered to big endian
    fn raw(&self, entry: &DirectoryEntry, directory: Directory) -> RawEntry {
        let mut value = self.bytes(entry).to_vec();
        self.order
            .convert_components(Endian::Big, &mut value, entry.format.swap_width());
        RawEntry {
            directory,
            tag: entry.tag,
            format: entry.format,
            count: entry.count,
            value,
        }
    }
}

/// Maker-note entry waiting for the camera make to be known
struct PendingMakerNote<'a> {
    block: Block<'a>,
    entry: DirectoryEntry,
    level: usize,
}

/// State of one decode pass
struct Walk<'r, 'a> {
    options: &'r ReadOptions,
    issues: Vec<Error>,
    record: MetadataRecord,
    thumbnail_offset: Option<usize>,
    thumbnail_length: Option<usize>,
    maker_note: Option<PendingMakerNote<'a>>,
}

impl<'r, 'a> Walk<'r, 'a> {
    fn new(options: &'r ReadOptions) -> Self {
        Self {
            options,
            issues: Vec::new(),
            record: MetadataRecord::default(),
            thumbnail_offset: None,
            thumbnail_length: None,
            maker_note: None,
        }
    }

    fn note(&mut self, directory: Directory, err: Error) {
        warn!("{} directory: {}", directory, err);
        self.issues.push(err);
    }

    /// Walk a directory whose failure only loses that branch
    fn branch(&mut self, block: Block<'a>, offset: usize, directory: Directory, level: usize) {
        if let Err(err) = self.directory(block, offset, directory, level) {
            self.note(directory, err);
        }
    }

    fn directory(
        &mut self,
        block: Block<'a>,
        offset: usize,
        directory: Directory,
        level: usize,
    ) -> Result<()> {
        if level > self.options.max_nesting {
            return Err(Error::ExcessiveNesting {
                offset,
                max: self.options.max_nesting,
            });
        }
        let table = block.read_directory(offset, self.options.max_directory_entries)?;
        debug!(
            "{} directory at {}: {} entries, level {}",
            directory,
            offset,
            table.entries.len(),
            level
        );
        if directory == Directory::Gps {
            self.record.gps.get_or_insert_with(GpsInfo::default);
        }

        for slot in table.entries {
            if let Err(err) = slot.and_then(|entry| self.route(block, entry, directory, level)) {
                self.note(directory, err);
            }
        }

        // Only IFD0 links to a sibling; the thumbnail directory's own link is ignored
        if directory == Directory::Ifd0 && table.next != 0 {
            self.branch(block, table.next, Directory::Thumbnail, level);
        }
        Ok(())
    }

    fn route(
        &mut self,
        block: Block<'a>,
        entry: DirectoryEntry,
        directory: Directory,
        level: usize,
    ) -> Result<()> {
        trace!(
            "{} {} {:?} x{}",
            directory,
            describe_tag(directory, entry.tag),
            entry.format,
            entry.count
        );
        if directory == Directory::Gps {
            return self.route_gps(block, entry);
        }

        match entry.tag {
            tags::DATE_TIME | tags::DATE_TIME_ORIGINAL | tags::DATE_TIME_DIGITIZED => {
                let value = block.text(&entry);
                let kept = self.record.push_date_time(
                    DateTimeEntry::new(directory, entry.tag, value),
                    self.options.max_date_copies,
                );
                if !kept {
                    debug!(
                        "dropping {}: repeated, or beyond {} date copies",
                        describe_tag(directory, entry.tag),
                        self.options.max_date_copies
                    );
                }
            }
            tags::EXIF_IFD_POINTER => {
                let target = block.unsigned(&entry)? as usize;
                self.branch(block, target, Directory::Exif, level + 1);
            }
            tags::GPS_IFD_POINTER => {
                let target = block.unsigned(&entry)? as usize;
                self.branch(block, target, Directory::Gps, level + 1);
            }
            tags::INTEROP_IFD_POINTER => {
                debug!("skipping interoperability directory");
            }
            tags::JPEG_INTERCHANGE_FORMAT if directory == Directory::Thumbnail => {
                self.thumbnail_offset = Some(block.unsigned(&entry)? as usize);
            }
            tags::JPEG_INTERCHANGE_FORMAT_LENGTH if directory == Directory::Thumbnail => {
                self.thumbnail_length = Some(block.unsigned(&entry)? as usize);
            }
            tags::MAKER_NOTE if directory != Directory::Thumbnail => {
                self.maker_note = Some(PendingMakerNote {
                    block,
                    entry,
                    level,
                });
            }
            _ => {
                if directory == Directory::Thumbnail
                    || entry.count == 0
                    || !self.field(block, &entry)?
                {
                    self.unknown(block.raw(&entry, directory));
                }
            }
        }
        Ok(())
    }

    /// Store a recognised field; false when the tag has no field
    fn field(&mut self, block: Block<'a>, entry: &DirectoryEntry) -> Result<bool> {
        let record = &mut self.record;
        match entry.tag {
            tags::MAKE => record.make = Some(block.text(entry)),
            tags::MODEL => record.model = Some(block.text(entry)),
            tags::IMAGE_DESCRIPTION => record.image_description = Some(block.text(entry)),
            tags::SOFTWARE => record.software = Some(block.text(entry)),
            tags::ARTIST => record.artist = Some(block.text(entry)),
            tags::COPYRIGHT => record.copyright = Some(block.text(entry)),
            tags::USER_COMMENT => record.user_comment = block.user_comment(entry),
            tags::ORIENTATION => record.orientation = Some(block.short(entry)?),
            tags::X_RESOLUTION => record.x_resolution = Some(block.rational(entry)?),
            tags::Y_RESOLUTION => record.y_resolution = Some(block.rational(entry)?),
            tags::RESOLUTION_UNIT => record.resolution_unit = Some(block.short(entry)?),
            tags::EXPOSURE_TIME => record.exposure_time = Some(block.rational(entry)?),
            tags::F_NUMBER => record.f_number = Some(block.rational(entry)?),
            tags::EXPOSURE_PROGRAM => {
                record.exposure_program = Some(ExposureProgram::from_code(block.short(entry)?))
            }
            tags::ISO_SPEED => record.iso = Some(block.short(entry)?),
            tags::EXPOSURE_BIAS => record.exposure_bias = Some(block.signed_rational(entry)?),
            tags::SUBJECT_DISTANCE => record.subject_distance = Some(block.rational(entry)?),
            tags::METERING_MODE => {
                record.metering_mode = Some(MeteringMode::from_code(block.short(entry)?))
            }
            tags::LIGHT_SOURCE => {
                record.light_source = Some(LightSource::from_code(block.short(entry)?))
            }
            tags::FLASH => record.flash = Some(block.short(entry)?),
            tags::FOCAL_LENGTH => record.focal_length = Some(block.rational(entry)?),
            tags::EXIF_IMAGE_WIDTH => record.exif_image_width = Some(block.unsigned(entry)?),
            tags::EXIF_IMAGE_LENGTH => record.exif_image_length = Some(block.unsigned(entry)?),
            tags::FOCAL_PLANE_X_RESOLUTION => {
                record.focal_plane_x_resolution = Some(block.rational(entry)?)
            }
            tags::FOCAL_PLANE_RESOLUTION_UNIT => {
                record.focal_plane_resolution_unit = Some(block.short(entry)?)
            }
            tags::EXPOSURE_MODE => {
                record.exposure_mode = Some(ExposureMode::from_code(block.short(entry)?))
            }
            tags::WHITE_BALANCE => {
                record.white_balance = Some(WhiteBalance::from_code(block.short(entry)?))
            }
            tags::DIGITAL_ZOOM_RATIO => record.digital_zoom_ratio = Some(block.rational(entry)?),
            tags::FOCAL_LENGTH_35MM => record.focal_length_35mm = Some(block.short(entry)?),
            tags::SUBJECT_DISTANCE_RANGE => {
                record.distance_range = Some(DistanceRange::from_code(block.short(entry)?))
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn route_gps(&mut self, block: Block<'a>, entry: DirectoryEntry) -> Result<()> {
        let gps = self.record.gps.get_or_insert_with(GpsInfo::default);
        let is_triple = entry.format == ExifFormat::Rational && entry.count >= 3;
        match entry.tag {
            tags::GPS_LATITUDE_REF => {
                gps.latitude_ref = block.text(&entry).chars().next()
            }
            tags::GPS_LATITUDE if is_triple => gps.latitude = Some(block.coordinate(&entry)?),
            tags::GPS_LONGITUDE_REF => {
                gps.longitude_ref = block.text(&entry).chars().next()
            }
            tags::GPS_LONGITUDE if is_triple => gps.longitude = Some(block.coordinate(&entry)?),
            tags::GPS_ALTITUDE_REF if entry.count > 0 => {
                gps.altitude_ref = Some(block.integer(&entry)?.clamp(0, 255) as u8)
            }
            tags::GPS_ALTITUDE if entry.count > 0 => gps.altitude = Some(block.rational(&entry)?),
            _ => self.unknown(block.raw(&entry, Directory::Gps)),
        }
        Ok(())
    }

    fn unknown(&mut self, raw: RawEntry) {
        let (directory, tag) = (raw.directory, raw.tag);
        if !self.record.push_unknown_entry(raw) {
            debug!("dropping repeated {}", describe_tag(directory, tag));
        }
    }

    /// Resolve what had to wait for the whole tree: the maker note and the
    /// thumbnail blob
    fn finish(&mut self, root: Block<'a>) {
        if let Some(pending) = self.maker_note.take() {
            self.decode_maker_note(pending);
        }
        if let (Some(offset), Some(length)) = (self.thumbnail_offset, self.thumbnail_length) {
            if length > 0 {
                match root.order.read_bytes(root.data, offset, length) {
                    Ok(bytes) => {
                        debug!("thumbnail: {} bytes at {}", length, offset);
                        self.record.thumbnail = Some(EmbeddedThumbnail::new(bytes));
                    }
                    Err(err) => self.note(Directory::Thumbnail, err),
                }
            }
        }
    }

    fn decode_maker_note(&mut self, pending: PendingMakerNote<'a>) {
        let PendingMakerNote {
            block,
            entry,
            level,
        } = pending;
        let blob = block.bytes(&entry);
        let mut note = MakerNote::opaque(blob.to_vec());

        if self.options.decode_maker_notes {
            if let Some((vendor, layout)) =
                maker_note::dispatch(self.record.make.as_deref(), blob)
            {
                let decoded = self
                    .vendor_entries(block, &entry, layout, level + 1)
                    .and_then(|entries| {
                        let mut data = blob.to_vec();
                        if let Layout::Directory { skip } = layout {
                            maker_note::relocate_directory(
                                &mut data,
                                skip,
                                block.order,
                                Endian::Big,
                                entry.value_offset as u32,
                                0,
                            )?;
                        }
                        Ok((data, entries))
                    });
                match decoded {
                    Ok((data, entries)) => {
                        debug!("{:?} maker note: {} entries", vendor, entries.len());
                        note = MakerNote {
                            vendor,
                            data,
                            entries,
                        };
                    }
                    Err(err) => self.note(Directory::MakerNote, err),
                }
            }
        }
        self.record.maker_note = Some(note);
    }

    fn vendor_entries(
        &mut self,
        block: Block<'a>,
        entry: &DirectoryEntry,
        layout: Layout,
        level: usize,
    ) -> Result<Vec<RawEntry>> {
        if level > self.options.max_nesting {
            return Err(Error::ExcessiveNesting {
                offset: entry.value_offset,
                max: self.options.max_nesting,
            });
        }
        let (inner, offset) = match layout {
            Layout::Directory { skip } => (block, entry.value_offset + skip),
            Layout::EmbeddedTiff { skip } => {
                let start = entry.value_offset + skip;
                let end = entry.value_offset + entry.byte_count;
                let data = block.data.get(start..end).ok_or(Error::OutOfBounds {
                    offset: start,
                    len: entry.byte_count.saturating_sub(skip),
                    size: block.data.len(),
                })?;
                let (order, ifd) = read_header(data)?;
                (Block { data, order }, ifd)
            }
        };

        let table = inner.read_directory(offset, self.options.max_directory_entries)?;
        let mut entries = Vec::with_capacity(table.entries.len());
        for slot in table.entries {
            match slot {
                Ok(found) => entries.push(inner.raw(&found, Directory::MakerNote)),
                Err(err) => self.note(Directory::MakerNote, err),
            }
        }
        Ok(entries)
    }
}
