//! JPEG asset handling
//!
//! [`JpegAsset`] owns the scanned sections of one JPEG and the metadata
//! decoded from its Exif section. Metadata is decoded on first access; edits
//! go through [`JpegAsset::metadata_mut`] and are written back into the
//! section list by [`JpegAsset::recreate_exif_section`].

use crate::{
    error::{Error, Result},
    formats::JpegIO,
    metadata::{GeoLocation, MetadataRecord},
    options::{ReadOptions, WriteOptions},
    segment::{FrameInfo, FrameProcess, JfifHeader, Marker, Section, MAX_SECTION_PAYLOAD},
    structure::Structure,
    tiff::{reader::ExifReader, writer, EXIF_SIGNATURE},
};
use std::fs;
use std::path::Path;

/// Supplier of encoded JPEG bytes
///
/// Implemented by whatever renders or compresses the image; this crate never
/// touches pixel data.
pub trait ImageSource {
    fn jpeg_bytes(&self) -> Result<Vec<u8>>;
}

impl ImageSource for [u8] {
    fn jpeg_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_vec())
    }
}

impl ImageSource for Vec<u8> {
    fn jpeg_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }
}

/// Fields stamped onto an image by [`JpegAsset::from_image`]
///
/// # Example
///
/// ```
/// use exif_io::{GeoLocation, ImageAnnotations};
///
/// let annotations = ImageAnnotations::new()
///     .with_title("Harbour")
///     .with_location(GeoLocation::new(40.4462, -79.9822, 250.0));
/// assert_eq!(annotations.title.as_deref(), Some("Harbour"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageAnnotations {
    pub location: Option<GeoLocation>,
    /// Written as the image description
    pub title: Option<String>,
    /// Written as a COM section
    pub comment: Option<String>,
    pub artist: Option<String>,
    pub software: Option<String>,
    pub copyright: Option<String>,
}

impl ImageAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_software(mut self, software: impl Into<String>) -> Self {
        self.software = Some(software.into());
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }
}

/// A scanned JPEG with lazily decoded Exif metadata
///
/// # Example
///
/// ```no_run
/// use exif_io::{JpegAsset, Orientation};
///
/// # fn main() -> exif_io::Result<()> {
/// let mut asset = JpegAsset::open("photo.jpg")?;
///
/// if let Some(record) = asset.metadata() {
///     println!("{}", record);
/// }
///
/// asset.metadata_mut().set_orientation(Orientation::Right);
/// asset.recreate_exif_section()?;
/// asset.write_to("rotated.jpg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JpegAsset {
    structure: Structure,
    handler: JpegIO,
    read_options: ReadOptions,
    write_options: WriteOptions,
    /// Set once the Exif section has been decoded (or found missing)
    loaded: bool,
    record: Option<MetadataRecord>,
    issues: Vec<Error>,
}

impl JpegAsset {
    /// Scan an in-memory JPEG
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let handler = JpegIO::new();
        let structure = handler.parse(data)?;
        Ok(Self::from_structure(structure))
    }

    /// Read and scan a JPEG file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Wrap an already scanned structure
    pub fn from_structure(structure: Structure) -> Self {
        Self {
            structure,
            handler: JpegIO::new(),
            read_options: ReadOptions::default(),
            write_options: WriteOptions::default(),
            loaded: false,
            record: None,
            issues: Vec::new(),
        }
    }

    /// Take JPEG bytes from `source` and stamp `annotations` onto them
    pub fn from_image<S: ImageSource + ?Sized>(
        source: &S,
        annotations: &ImageAnnotations,
    ) -> Result<Self> {
        let data = source.jpeg_bytes()?;
        let mut asset = Self::from_bytes(&data)?;

        let record = asset.metadata_mut();
        if let Some(location) = annotations.location {
            record.set_location(location);
        }
        if let Some(title) = &annotations.title {
            record.image_description = Some(title.clone());
        }
        if let Some(artist) = &annotations.artist {
            record.artist = Some(artist.clone());
        }
        if let Some(software) = &annotations.software {
            record.software = Some(software.clone());
        }
        if let Some(copyright) = &annotations.copyright {
            record.copyright = Some(copyright.clone());
        }
        if let Some(comment) = &annotations.comment {
            asset.set_comment(comment)?;
        }

        asset.recreate_exif_section()?;
        Ok(asset)
    }

    /// Options used by the next lazy decode
    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self.loaded = false;
        self.record = None;
        self
    }

    /// Options used by [`recreate_exif_section`](Self::recreate_exif_section)
    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn sections(&self) -> &[Section] {
        self.structure.sections()
    }

    /// Assemble the current sections into JPEG bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.handler.assemble(&self.structure)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn has_exif(&self) -> bool {
        self.structure.find(Marker::Exif).is_some()
    }

    fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        let Some(section) = self.structure.find(Marker::Exif) else {
            return;
        };

        let mut reader = ExifReader::new(self.read_options.clone());
        match reader.decode(&section.data, EXIF_SIGNATURE.len()) {
            Ok(record) => {
                self.issues = reader.take_issues();
                self.record = Some(record);
            }
            Err(err) => {
                log::warn!("Exif section could not be decoded: {}", err);
                self.issues = vec![err];
            }
        }
    }

    /// Decoded metadata, or None when there is no usable Exif section
    pub fn metadata(&mut self) -> Option<&MetadataRecord> {
        self.load();
        self.record.as_ref()
    }

    /// Metadata for editing; an empty record is created when there is none
    pub fn metadata_mut(&mut self) -> &mut MetadataRecord {
        self.load();
        self.record.get_or_insert_with(MetadataRecord::new)
    }

    /// Failures recovered during the last decode
    pub fn exif_issues(&mut self) -> &[Error] {
        self.load();
        &self.issues
    }

    /// Append a section after the existing ones
    pub fn add_section(&mut self, section: Section) {
        if section.marker == Marker::Exif {
            self.add_exif_section(section);
        } else {
            self.structure.push(section);
        }
    }

    /// Insert an Exif section, replacing any present
    pub fn add_exif_section(&mut self, section: Section) {
        self.structure.insert_exif(section);
        self.loaded = false;
        self.record = None;
        self.issues.clear();
    }

    pub fn find_section(&self, marker: Marker) -> Option<&Section> {
        self.structure.find(marker)
    }

    /// Remove every section of this kind; true if any was removed
    pub fn remove_sections(&mut self, marker: Marker) -> bool {
        let removed = self.structure.remove(marker);
        if removed && marker == Marker::Exif {
            self.loaded = true;
            self.record = None;
            self.issues.clear();
        }
        removed
    }

    pub fn remove_unknown_sections(&mut self) -> bool {
        self.structure.remove_unknown()
    }

    /// Rebuild the Exif section from the current metadata
    ///
    /// When nothing was decoded and nothing edited, an empty record is
    /// written.
    pub fn recreate_exif_section(&mut self) -> Result<()> {
        self.load();
        let record = self.record.get_or_insert_with(MetadataRecord::new);
        let tiff = writer::encode(record, &self.write_options)?;
        let mut payload = EXIF_SIGNATURE.to_vec();
        payload.extend_from_slice(&tiff);
        if payload.len() > MAX_SECTION_PAYLOAD {
            return Err(Error::DataTooLarge {
                size: payload.len(),
                max: MAX_SECTION_PAYLOAD,
            });
        }
        log::debug!("rebuilt Exif section: {} bytes", payload.len());
        self.structure.insert_exif(Section::new(Marker::Exif, payload));
        Ok(())
    }

    /// Text of the first COM section, without trailing NULs
    pub fn comment(&self) -> Option<String> {
        let section = self.structure.find(Marker::Comment)?;
        let text = String::from_utf8_lossy(&section.data);
        Some(text.trim_end_matches('\0').to_string())
    }

    /// Replace any COM section; an empty comment just removes them
    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        if comment.len() > MAX_SECTION_PAYLOAD {
            return Err(Error::DataTooLarge {
                size: comment.len(),
                max: MAX_SECTION_PAYLOAD,
            });
        }
        self.structure.remove(Marker::Comment);
        if !comment.is_empty() {
            let index = self.structure.after_app_sections();
            self.structure.insert(
                index,
                Section::new(Marker::Comment, comment.as_bytes().to_vec()),
            );
        }
        Ok(())
    }

    /// Frame header of the first start-of-frame section
    pub fn frame_info(&self) -> Result<Option<FrameInfo>> {
        let frame = self.structure.sections().iter().find(|s| match s.marker {
            Marker::Sof(n) => FrameProcess::from_sof(n).is_some(),
            _ => false,
        });
        frame.map(FrameInfo::parse).transpose()
    }

    pub fn jfif_header(&self) -> Option<JfifHeader> {
        JfifHeader::parse(&self.structure.find(Marker::Jfif)?.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::Orientation,
        tiff::tags,
        test_utils::*,
        Endian,
    };

    fn tiff_with_make(make: &str) -> Vec<u8> {
        let mut tiff = TiffFixture::new(Endian::Little);
        tiff.directory(
            &[
                FixtureEntry::ascii(tags::MAKE, make),
                FixtureEntry::short(tags::ORIENTATION, 6),
            ],
            0,
        );
        tiff.finish()
    }

    #[test]
    fn test_lazy_metadata() {
        let mut asset = JpegAsset::from_bytes(&jpeg_with_exif(&tiff_with_make("Pentax"))).unwrap();
        assert!(asset.has_exif());
        let record = asset.metadata().unwrap();
        assert_eq!(record.make.as_deref(), Some("Pentax"));
        assert_eq!(record.orientation(), Some(Orientation::Right));
        assert!(asset.exif_issues().is_empty());
    }

    #[test]
    fn test_no_exif_is_not_an_error() {
        let mut asset = JpegAsset::from_bytes(&minimal_jpeg()).unwrap();
        assert!(!asset.has_exif());
        assert!(asset.metadata().is_none());
        assert!(asset.exif_issues().is_empty());
    }

    #[test]
    fn test_bad_exif_leaves_sections_usable() {
        let jpeg = jpeg_with_exif(b"XX\0\x2A\0\0\0\x08");
        let mut asset = JpegAsset::from_bytes(&jpeg).unwrap();
        assert!(asset.metadata().is_none());
        assert!(matches!(asset.exif_issues(), [Error::BadTiffHeader(_)]));
        assert_eq!(asset.to_bytes().unwrap(), jpeg);
    }

    #[test]
    fn test_recreate_exif_section() {
        let mut asset = JpegAsset::from_bytes(&minimal_jpeg()).unwrap();
        asset.metadata_mut().make = Some("Canon".into());
        asset.recreate_exif_section().unwrap();

        let kinds: Vec<_> = asset.sections().iter().map(|s| s.marker).collect();
        assert_eq!(kinds[0], Marker::Jfif);
        assert_eq!(kinds[1], Marker::Exif);

        let bytes = asset.to_bytes().unwrap();
        let mut reread = JpegAsset::from_bytes(&bytes).unwrap();
        assert_eq!(reread.metadata().unwrap().make.as_deref(), Some("Canon"));

        // Rebuilding twice without edits is byte-identical
        asset.recreate_exif_section().unwrap();
        assert_eq!(asset.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_remove_exif() {
        let mut asset = JpegAsset::from_bytes(&jpeg_with_exif(&tiff_with_make("Pentax"))).unwrap();
        assert!(asset.remove_sections(Marker::Exif));
        assert!(!asset.has_exif());
        assert!(asset.metadata().is_none());
        assert_eq!(asset.to_bytes().unwrap(), minimal_jpeg());
    }

    #[test]
    fn test_comment() {
        let mut asset = JpegAsset::from_bytes(&minimal_jpeg()).unwrap();
        assert_eq!(asset.comment(), None);
        asset.set_comment("hello").unwrap();
        assert_eq!(asset.comment().as_deref(), Some("hello"));
        // After APP0, before DQT
        assert_eq!(asset.sections()[1].marker, Marker::Comment);

        asset.set_comment("again").unwrap();
        let comments = asset
            .sections()
            .iter()
            .filter(|s| s.marker == Marker::Comment)
            .count();
        assert_eq!(comments, 1);

        asset.set_comment("").unwrap();
        assert!(asset.find_section(Marker::Comment).is_none());
    }

    #[test]
    fn test_frame_and_jfif() {
        let asset = JpegAsset::from_bytes(&minimal_jpeg()).unwrap();
        let frame = asset.frame_info().unwrap().unwrap();
        assert_eq!(frame.process, FrameProcess::Baseline);
        assert_eq!((frame.width, frame.height), (16, 8));
        assert!(!frame.is_color());

        let jfif = asset.jfif_header().unwrap();
        assert_eq!((jfif.major_version, jfif.minor_version), (1, 1));
    }

    #[test]
    fn test_from_image() {
        let annotations = ImageAnnotations::new()
            .with_title("Harbour")
            .with_comment("shot from the pier")
            .with_artist("A. Photographer")
            .with_location(GeoLocation::new(-33.8568, 151.2153, 12.0));
        let asset_bytes = minimal_jpeg();
        let asset = JpegAsset::from_image(&asset_bytes, &annotations).unwrap();
        assert_eq!(asset.comment().as_deref(), Some("shot from the pier"));

        let mut reread = JpegAsset::from_bytes(&asset.to_bytes().unwrap()).unwrap();
        let record = reread.metadata().unwrap();
        assert_eq!(record.image_description.as_deref(), Some("Harbour"));
        assert_eq!(record.artist.as_deref(), Some("A. Photographer"));
        let location = record.location().unwrap();
        assert!((location.latitude + 33.8568).abs() < 1e-4);
        assert!((location.longitude - 151.2153).abs() < 1e-4);
    }

    #[test]
    fn test_add_section_routes_exif() {
        let mut asset = JpegAsset::from_bytes(&minimal_jpeg()).unwrap();
        asset.add_section(Section::new(Marker::App(2), vec![1, 2]));
        assert_eq!(asset.sections().last().unwrap().marker, Marker::App(2));

        let payload = exif_payload(&tiff_with_make("Ricoh"));
        asset.add_section(Section::new(Marker::Exif, payload));
        assert_eq!(asset.sections()[1].marker, Marker::Exif);
        assert_eq!(asset.metadata().unwrap().make.as_deref(), Some("Ricoh"));

        assert!(asset.remove_unknown_sections());
        assert!(asset.find_section(Marker::App(2)).is_none());
    }
}
