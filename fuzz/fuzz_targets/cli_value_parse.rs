//! Fuzz target for the comma-separated CLI value parsers.

#![no_main]

use libfuzzer_sys::fuzz_target;
use streetbox::annotation::BoundingBox;
use streetbox::location::ViewPosition;
use streetbox::raster::CropRegion;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let _ = raw.parse::<CropRegion>();
    let _ = raw.parse::<BoundingBox>();
    let _ = raw.parse::<ViewPosition>();
});
