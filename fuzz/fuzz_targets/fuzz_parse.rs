#![no_main]

use exif_io::{ExifReader, JpegAsset, ReadOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any input as a JPEG: must only ever return errors, never panic
    if let Ok(mut asset) = JpegAsset::from_bytes(data) {
        let _ = asset.metadata();
        let _ = asset.exif_issues();
        let _ = asset.frame_info();
        let _ = asset.jfif_header();
        let _ = asset.comment();
    }

    // Any input as a bare TIFF block
    let mut reader = ExifReader::new(ReadOptions::default());
    let _ = reader.decode(data, 0);
});
