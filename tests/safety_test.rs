//! Safety tests - basic validation of security mechanisms
//!
//! These tests verify that limits and bounds checks hold on hostile input.
//! Comprehensive testing should be done with fuzzing (cargo-fuzz).

use exif_io::{
    segment::MAX_SECTION_PAYLOAD, tags, test_utils::*, Endian, Error, ExifReader, JpegAsset,
    JpegIO, ReadOptions,
};

#[test]
fn test_max_section_payload_constant() {
    // Length field is 16 bits and counts itself
    assert_eq!(MAX_SECTION_PAYLOAD, 0xFFFF - 2);
}

#[test]
fn test_declared_length_past_end() {
    let mut jpeg = minimal_jpeg();
    // Cut inside the DQT payload
    jpeg.truncate(2 + 18 + 20);
    match JpegIO::new().parse(&jpeg) {
        Err(Error::TruncatedSection { marker, .. }) => assert_eq!(marker, 0xDB),
        other => panic!("expected TruncatedSection, got {:?}", other),
    }
}

#[test]
fn test_every_truncation_is_an_error() {
    let jpeg = jpeg_with_exif(&TiffFixture::new(Endian::Little).finish());
    let handler = JpegIO::new();
    // Cutting anywhere before the SOS marker must fail cleanly
    let sos = jpeg.len() - SCAN_TAIL.len();
    for len in 0..sos {
        assert!(handler.parse(&jpeg[..len]).is_err(), "len {}", len);
    }
}

#[test]
fn test_directory_cycle_is_bounded() {
    // IFD0 -> Exif -> Exif -> ... via a self-referencing pointer
    let mut tiff = TiffFixture::new(Endian::Big);
    let ifd0 = tiff.reserve_directory(1);
    let exif = tiff.reserve_directory(2);
    tiff.fill_directory(
        exif,
        &[
            FixtureEntry::short(tags::ISO_SPEED, 400),
            FixtureEntry::long(tags::EXIF_IFD_POINTER, exif),
        ],
        0,
    );
    tiff.fill_directory(ifd0, &[FixtureEntry::long(tags::EXIF_IFD_POINTER, exif)], 0);
    let data = tiff.finish();

    for max in [1, 2, 4, 8] {
        let mut reader = ExifReader::new(ReadOptions::new().with_max_nesting(max));
        let record = reader.decode(&data, 0).unwrap();
        assert_eq!(record.iso, Some(400));
        let nesting: Vec<_> = reader
            .issues()
            .iter()
            .filter(|e| matches!(e, Error::ExcessiveNesting { .. }))
            .collect();
        assert_eq!(nesting.len(), 1, "max {}", max);
    }
}

#[test]
fn test_hostile_offsets_do_not_panic() {
    let mut tiff = TiffFixture::new(Endian::Little);
    tiff.directory(
        &[
            FixtureEntry::long(tags::EXIF_IFD_POINTER, u32::MAX),
            FixtureEntry::long(tags::GPS_IFD_POINTER, 0xFFFF_FFF0),
            FixtureEntry::ascii(tags::MAKE, "Canon").with_count(u32::MAX),
            FixtureEntry::short(tags::ORIENTATION, 1).with_format(0xFFFF),
        ],
        u32::MAX,
    );
    let data = tiff.finish();

    let mut reader = ExifReader::new(ReadOptions::default());
    let record = reader.decode(&data, 0).unwrap();
    assert!(record.make.is_none());
    assert!(record.orientation.is_none());
    assert!(!reader.issues().is_empty());
    assert!(reader.issues().iter().all(Error::is_recoverable));
}

#[test]
fn test_entry_count_limit() {
    let mut tiff = TiffFixture::new(Endian::Big);
    let entries: Vec<_> = (0..20)
        .map(|i| FixtureEntry::short(0xC000 + i, i))
        .collect();
    tiff.directory(&entries, 0);
    let data = tiff.finish();

    let mut reader = ExifReader::new(ReadOptions::new().with_max_directory_entries(10));
    assert!(matches!(
        reader.decode(&data, 0),
        Err(Error::InvalidSegment { .. })
    ));
}

#[test]
fn test_broken_exif_keeps_jpeg_usable() {
    let mut tiff = TiffFixture::new(Endian::Big);
    tiff.set_ifd0_offset(0x7FFF_FFFF);
    let jpeg = jpeg_with_exif(&tiff.finish());

    let mut asset = JpegAsset::from_bytes(&jpeg).unwrap();
    assert!(asset.metadata().is_none());
    assert_eq!(asset.exif_issues().len(), 1);
    assert_eq!(asset.to_bytes().unwrap(), jpeg);
    assert!(asset.frame_info().unwrap().is_some());
}
