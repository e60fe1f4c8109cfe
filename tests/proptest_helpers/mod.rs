#![allow(dead_code)]

use streetbox::annotation::{AnnotationDocument, BoundingBox};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_VOC: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Labels including markup, surrounding whitespace and control characters.
pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        Just("transformer".to_string()),
        Just("pole".to_string()),
        " [a-z]{1,6} ",
        "[a-zA-Z0-9_<>&\"' \t\r\n-]{0,12}",
        "[a-z\\x01-\\x08\\x0B\\x0C\\x0E-\\x1F]{0,8}",
    ]
    .boxed()
}

/// What a label reads back as: characters XML cannot carry become U+FFFD.
pub fn encoded_label(label: &str) -> String {
    label
        .chars()
        .map(|ch| match ch {
            '\t' | '\n' | '\r' => ch,
            ch if ch < ' ' => char::REPLACEMENT_CHARACTER,
            ch => ch,
        })
        .collect()
}

pub fn arb_bounding_box() -> BoxedStrategy<BoundingBox> {
    (
        arb_label(),
        -1.0e4..1.0e4f64,
        -1.0e4..1.0e4f64,
        0.0..1.0e4f64,
        0.0..1.0e4f64,
    )
        .prop_map(|(label, left, top, width, height)| {
            BoundingBox::new(label, left, top, width, height)
        })
        .boxed()
}

pub fn arb_document(max_objects: usize) -> BoxedStrategy<AnnotationDocument> {
    (
        "[a-z0-9_]{1,10}",
        0u32..10_000,
        0u32..10_000,
        prop::collection::vec(arb_bounding_box(), 0..=max_objects),
    )
        .prop_map(|(stem, width, height, objects)| {
            AnnotationDocument::new(format!("{stem}.jpg"), width, height, objects)
        })
        .boxed()
}

fn close(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps * a.abs().max(b.abs()).max(1.0)
}

/// Same header and the same boxes in the same order, within `eps`.
pub fn assert_documents_equivalent(
    expected: &AnnotationDocument,
    actual: &AnnotationDocument,
    eps: f64,
) -> Result<(), String> {
    if expected.filename != actual.filename {
        return Err(format!(
            "filename mismatch: {:?} vs {:?}",
            expected.filename, actual.filename
        ));
    }
    if (expected.width, expected.height) != (actual.width, actual.height) {
        return Err(format!(
            "size mismatch: {}x{} vs {}x{}",
            expected.width, expected.height, actual.width, actual.height
        ));
    }
    if expected.objects.len() != actual.objects.len() {
        return Err(format!(
            "object count mismatch: {} vs {}",
            expected.objects.len(),
            actual.objects.len()
        ));
    }

    for (index, (e, a)) in expected.objects.iter().zip(&actual.objects).enumerate() {
        let expected_label = encoded_label(&e.label);
        if expected_label != a.label {
            return Err(format!(
                "object {index}: label {expected_label:?} vs {:?}",
                a.label
            ));
        }
        let pairs = [
            ("left", e.left, a.left),
            ("top", e.top, a.top),
            ("width", e.width, a.width),
            ("height", e.height, a.height),
        ];
        for (field, ev, av) in pairs {
            if !close(ev, av, eps) {
                return Err(format!("object {index}: {field} {ev} vs {av}"));
            }
        }
    }
    Ok(())
}
