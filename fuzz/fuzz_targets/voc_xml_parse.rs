//! Fuzz target for VOC XML parsing.
//!
//! Parses arbitrary UTF-8 as an annotation document and, when that
//! succeeds, checks that re-encoding keeps every object.

#![no_main]

use libfuzzer_sys::fuzz_target;
use streetbox::annotation::voc::{from_voc_xml_str, to_voc_xml_string};

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(document) = from_voc_xml_str(xml) {
        let encoded = to_voc_xml_string(&document);
        assert_eq!(encoded.matches("<object>").count(), document.objects.len());
    }
});
