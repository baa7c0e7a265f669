// Integration tests using the test_utils module

#[cfg(test)]
mod fixture_tests {
    use exif_io::{
        tags, test_utils::*, Endian, GeoLocation, JpegAsset, JpegIO, Marker, Orientation,
        WriteOptions,
    };

    /// IFD0 with make and a GPS pointer; GPS dir with the given latitude
    fn gps_tiff(order: Endian, latitude_ref: &str) -> Vec<u8> {
        let mut tiff = TiffFixture::new(order);
        let ifd0 = tiff.reserve_directory(2);
        let gps = tiff.directory(
            &[
                FixtureEntry::ascii(tags::GPS_LATITUDE_REF, latitude_ref),
                FixtureEntry::rationals(tags::GPS_LATITUDE, &[(40, 1), (26, 1), (463, 10)]),
            ],
            0,
        );
        tiff.fill_directory(
            ifd0,
            &[
                FixtureEntry::ascii(tags::MAKE, "Canon"),
                FixtureEntry::long(tags::GPS_IFD_POINTER, gps),
            ],
            0,
        );
        tiff.finish()
    }

    #[test]
    fn test_scan_jfif_only_jpeg() {
        let structure = JpegIO::new().parse(&minimal_jpeg()).unwrap();
        assert_eq!(structure.sections()[0].marker, Marker::Jfif);
        assert_eq!(structure.sections()[0].data.len(), 14);
        assert_eq!(structure.scan(), SCAN_TAIL);
        assert!(structure.find(Marker::Exif).is_none());
    }

    #[test]
    fn test_gps_latitude_from_jpeg() {
        for order in [Endian::Big, Endian::Little] {
            let mut north = JpegAsset::from_bytes(&jpeg_with_exif(&gps_tiff(order, "N"))).unwrap();
            let latitude = north.metadata().unwrap().gps.as_ref().unwrap().latitude_degrees();
            let latitude = latitude.unwrap();
            assert!((latitude - 40.4462).abs() < 1e-4, "{}", latitude);

            let mut south = JpegAsset::from_bytes(&jpeg_with_exif(&gps_tiff(order, "S"))).unwrap();
            let gps = south.metadata().unwrap().gps.clone().unwrap();
            assert_eq!(gps.latitude_degrees(), Some(-latitude));
        }
    }

    #[test]
    fn test_edit_and_round_trip() {
        for order in [Endian::Big, Endian::Little] {
            let jpeg = jpeg_with_exif(&gps_tiff(Endian::Big, "N"));
            let mut asset = JpegAsset::from_bytes(&jpeg)
                .unwrap()
                .with_write_options(WriteOptions::new().with_byte_order(order));

            let record = asset.metadata_mut();
            record.model = Some("EOS 5D".into());
            record.set_orientation(Orientation::Left);
            record.set_date_time("2010:01:04 12:30:00");
            asset.recreate_exif_section().unwrap();
            let expected = asset.metadata().unwrap().clone();

            let bytes = asset.to_bytes().unwrap();
            let mut reread = JpegAsset::from_bytes(&bytes)
                .unwrap()
                .with_write_options(WriteOptions::new().with_byte_order(order));
            assert_eq!(reread.metadata().unwrap(), &expected);
            assert!(reread.exif_issues().is_empty());

            let tiff = reread.find_section(Marker::Exif).unwrap().exif_tiff().unwrap();
            assert_eq!(&tiff[0..2], order.order_mark());

            // Rebuilding without edits is byte-identical
            reread.recreate_exif_section().unwrap();
            assert_eq!(reread.to_bytes().unwrap(), bytes);
        }
    }

    #[test]
    fn test_pixel_sections_survive_rewrite() {
        let jpeg = jpeg_with_exif(&gps_tiff(Endian::Little, "N"));
        let original = JpegIO::new().parse(&jpeg).unwrap();

        let mut asset = JpegAsset::from_bytes(&jpeg).unwrap();
        asset.metadata_mut().clear_location();
        asset.recreate_exif_section().unwrap();
        let rewritten = JpegIO::new().parse(&asset.to_bytes().unwrap()).unwrap();

        assert_eq!(rewritten.scan(), original.scan());
        for marker in [Marker::Jfif, Marker::Dqt, Marker::Sof(0), Marker::Dht] {
            assert_eq!(rewritten.find(marker), original.find(marker), "{}", marker);
        }
    }

    #[test]
    fn test_stamp_annotations() {
        let annotations = exif_io::ImageAnnotations::new()
            .with_title("Pier")
            .with_software("exif-io")
            .with_copyright("(c) 2010")
            .with_location(GeoLocation::new(51.5007, -0.1246, 5.0));
        let asset = JpegAsset::from_image(&minimal_jpeg(), &annotations).unwrap();

        let mut reread = JpegAsset::from_bytes(&asset.to_bytes().unwrap()).unwrap();
        let record = reread.metadata().unwrap();
        assert_eq!(record.software.as_deref(), Some("exif-io"));
        assert_eq!(record.copyright.as_deref(), Some("(c) 2010"));
        let location = record.location().unwrap();
        assert!(location.longitude < 0.0);
        assert!((location.altitude - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_list_fixtures() {
        // Real-world files are optional; each must scan and rebuild to the same sections
        for path in list_fixtures().unwrap() {
            let data = std::fs::read(&path).unwrap();
            let handler = JpegIO::new();
            let structure = match handler.parse(&data) {
                Ok(structure) => structure,
                Err(e) => panic!("{}: {}", path.display(), e),
            };
            let rebuilt = handler.assemble(&structure).unwrap();
            assert_eq!(handler.parse(&rebuilt).unwrap(), structure);

            let mut asset = JpegAsset::from_structure(structure);
            if asset.has_exif() {
                // A broken Exif block is reported, never fatal
                let _ = asset.metadata();
            }
        }
    }
}
