//! Pascal VOC XML encoder and reader.
//!
//! The encoder is the export format of record. Its layout is fixed: empty
//! folder, the filename repeated as path, depth 3, segmented 0, then one
//! `<object>` per box in insertion order with corners written as
//! xmin, xmax, ymin, ymax.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use roxmltree::Node;

use super::{AnnotationDocument, BoundingBox, IMAGE_DEPTH};
use crate::error::StreetboxError;
use crate::geometry::BBoxXYXY;

/// Extension used for annotation documents.
pub const VOC_XML_EXTENSION: &str = "xml";

/// Encode a document as VOC XML.
///
/// Output depends only on `document`. Coordinates pass through unchecked.
pub fn to_voc_xml_string(document: &AnnotationDocument) -> String {
    let mut xml = String::new();
    let filename = xml_escape(&document.filename);

    writeln!(xml, "<annotation>").expect("write to string");
    writeln!(xml, "<folder></folder>").expect("write to string");
    writeln!(xml, "<filename>{filename}</filename>").expect("write to string");
    writeln!(xml, "<path>{filename}</path>").expect("write to string");
    writeln!(xml, "<size>").expect("write to string");
    writeln!(xml, "    <width>{}</width>", document.width).expect("write to string");
    writeln!(xml, "    <height>{}</height>", document.height).expect("write to string");
    writeln!(xml, "    <depth>{IMAGE_DEPTH}</depth>").expect("write to string");
    writeln!(xml, "</size>").expect("write to string");
    writeln!(xml, "<segmented>0</segmented>").expect("write to string");

    for object in &document.objects {
        let corners = object.corners();
        writeln!(xml, "<object>").expect("write to string");
        writeln!(xml, "    <name>{}</name>", xml_escape(&object.label)).expect("write to string");
        writeln!(xml, "    <bndbox>").expect("write to string");
        writeln!(xml, "        <xmin>{}</xmin>", corners.xmin()).expect("write to string");
        writeln!(xml, "        <xmax>{}</xmax>", corners.xmax()).expect("write to string");
        writeln!(xml, "        <ymin>{}</ymin>", corners.ymin()).expect("write to string");
        writeln!(xml, "        <ymax>{}</ymax>", corners.ymax()).expect("write to string");
        writeln!(xml, "    </bndbox>").expect("write to string");
        writeln!(xml, "</object>").expect("write to string");
    }

    write!(xml, "</annotation>").expect("write to string");
    xml
}

/// Encode `document` and write it to `path`.
pub fn write_voc_xml(path: &Path, document: &AnnotationDocument) -> Result<(), StreetboxError> {
    fs::write(path, to_voc_xml_string(document)).map_err(StreetboxError::Io)
}

/// Read an annotation document from a file.
pub fn read_voc_xml(path: &Path) -> Result<AnnotationDocument, StreetboxError> {
    let xml = fs::read_to_string(path).map_err(StreetboxError::Io)?;
    parse_voc_xml_str(&xml, path)
}

/// Parse an annotation document from a UTF-8 string.
pub fn from_voc_xml_str(xml: &str) -> Result<AnnotationDocument, StreetboxError> {
    parse_voc_xml_str(xml, Path::new("<memory>"))
}

fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<AnnotationDocument, StreetboxError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| StreetboxError::AnnotationParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(StreetboxError::AnnotationParse {
            path: path.to_path_buf(),
            message: "missing <annotation> root element".to_string(),
        });
    }

    let filename = required_child_text(annotation, "filename", path, "<annotation>")?;
    let size = required_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required::<u32>(size, "width", path, "<size>")?;
    let height = parse_required::<u32>(size, "height", path, "<size>")?;

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        // Labels are kept verbatim; an empty <name> is a valid label.
        let label = child_element(object, "name")
            .map(|node| node.text().unwrap_or_default().to_string())
            .ok_or_else(|| StreetboxError::AnnotationParse {
                path: path.to_path_buf(),
                message: "missing <name> in <object>".to_string(),
            })?;
        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;

        let xmin = parse_required::<f64>(bndbox, "xmin", path, "<bndbox>")?;
        let xmax = parse_required::<f64>(bndbox, "xmax", path, "<bndbox>")?;
        let ymin = parse_required::<f64>(bndbox, "ymin", path, "<bndbox>")?;
        let ymax = parse_required::<f64>(bndbox, "ymax", path, "<bndbox>")?;

        objects.push(BoundingBox::from_corners(
            label,
            BBoxXYXY::from_xyxy(xmin, ymin, xmax, ymax),
        ));
    }

    Ok(AnnotationDocument {
        filename,
        width,
        height,
        objects,
    })
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, StreetboxError> {
    child_element(node, tag).ok_or_else(|| StreetboxError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, StreetboxError> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| StreetboxError::AnnotationParse {
            path: path.to_path_buf(),
            message: format!("missing <{tag}> in {context}"),
        })
}

fn parse_required<T: std::str::FromStr>(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<T, StreetboxError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<T>().map_err(|_| StreetboxError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!(
            "invalid <{tag}> value '{raw}' in {context}; expected {}",
            std::any::type_name::<T>()
        ),
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

/// Escapes markup and replaces characters XML 1.0 cannot represent with
/// U+FFFD.
fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Parsers rewrite a raw CR to LF.
            '\r' => escaped.push_str("&#xD;"),
            ch if is_xml_char(ch) => escaped.push(ch),
            _ => escaped.push(char::REPLACEMENT_CHARACTER),
        }
    }
    escaped
}

/// The XML 1.0 `Char` production.
fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\u{9}' | '\u{A}' | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}
