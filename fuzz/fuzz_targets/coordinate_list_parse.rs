//! Fuzz target for pasted coordinate lists.

#![no_main]

use libfuzzer_sys::fuzz_target;
use streetbox::location::parse_coordinate_list;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let coords = parse_coordinate_list(text);
    assert!(coords.len() <= text.lines().count());
});
