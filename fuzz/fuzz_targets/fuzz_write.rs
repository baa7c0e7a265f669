#![no_main]

use exif_io::{Endian, JpegAsset, WriteOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse, rebuild the Exif section in both byte orders, and re-scan
    for order in [Endian::Big, Endian::Little] {
        let Ok(asset) = JpegAsset::from_bytes(data) else {
            return;
        };
        let mut asset =
            asset.with_write_options(WriteOptions::new().with_byte_order(order));
        if asset.recreate_exif_section().is_err() {
            continue;
        }
        if let Ok(output) = asset.to_bytes() {
            let _ = JpegAsset::from_bytes(&output).map(|mut a| a.metadata().cloned());
        }
    }
});
