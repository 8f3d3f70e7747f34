//! Low-level page dictionary helpers
//!
//! Page attributes such as `MediaBox` and `Resources` may be inherited from
//! ancestors in the page tree, and `Contents` may be a single stream or an
//! array of streams. Everything that reads or rewrites those entries goes
//! through here so the transform code can stay declarative.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::PdfToolError;
use crate::operations::PdfRect;

/// Guard against cyclic `Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 32;

/// Page attributes that may be inherited from ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfToolError> {
    doc.get_dictionary(page_id)
        .map_err(|e| PdfToolError::OperationError(format!("Invalid page {:?}: {}", page_id, e)))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfToolError> {
    doc.get_dictionary_mut(page_id)
        .map_err(|e| PdfToolError::OperationError(format!("Invalid page {:?}: {}", page_id, e)))
}

/// Follow a reference if `obj` is one
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up an inheritable page attribute, walking up the `Parent` chain
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// The page's MediaBox, inherited if the page itself does not carry one
pub fn effective_media_box(doc: &Document, page_id: ObjectId) -> Option<PdfRect> {
    let values = inherited_attribute(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut corners = [0.0f32; 4];
    for (slot, value) in corners.iter_mut().zip(values) {
        *slot = resolve(doc, value)?.as_float().ok()?;
    }
    Some(PdfRect::from_box(&corners))
}

/// Copy inherited attributes onto the page itself, so the page can be
/// re-parented without changing how it renders
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfToolError> {
    let mut found = Vec::new();
    for key in INHERITABLE_KEYS {
        if page_dict(doc, page_id)?.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(doc, page_id, key) {
            found.push((key, value.clone()));
        }
    }
    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in found {
        page.set(key, value);
    }
    Ok(())
}

/// Overwrite MediaBox, CropBox and TrimBox with the same rectangle
pub fn set_page_boxes(
    doc: &mut Document,
    page_id: ObjectId,
    rect: &PdfRect,
) -> Result<(), PdfToolError> {
    let as_array = || {
        Object::Array(vec![
            Object::Real(rect.x),
            Object::Real(rect.y),
            Object::Real(rect.x + rect.width),
            Object::Real(rect.y + rect.height),
        ])
    };
    let page = page_dict_mut(doc, page_id)?;
    page.set("MediaBox", as_array());
    page.set("CropBox", as_array());
    page.set("TrimBox", as_array());
    Ok(())
}

/// Read one of the page's box arrays as stored on the page itself
pub fn page_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PdfRect> {
    let values = page_dict(doc, page_id).ok()?.get(key).ok()?.as_array().ok()?;
    let floats: Vec<f32> = values.iter().filter_map(|v| v.as_float().ok()).collect();
    let corners: [f32; 4] = floats.try_into().ok()?;
    Some(PdfRect::from_box(&corners))
}

/// Encode operations into content stream bytes, newline terminated so that
/// concatenated streams never fuse tokens
pub fn encode_operations(operations: Vec<Operation>) -> Result<Vec<u8>, PdfToolError> {
    let mut bytes = Content { operations }
        .encode()
        .map_err(|e| PdfToolError::SerializationError(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// References to the page's current content streams, in drawing order.
///
/// A direct stream (not allowed by the format, but seen in the wild) is
/// moved into its own object so it can be referenced from an array.
fn content_references(doc: &mut Document, page_id: ObjectId) -> Result<Vec<Object>, PdfToolError> {
    let contents = page_dict(doc, page_id)?.get(b"Contents").ok().cloned();
    Ok(match contents {
        Some(Object::Reference(id)) => vec![Object::Reference(id)],
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![Object::Reference(doc.add_object(stream))],
        _ => Vec::new(),
    })
}

fn set_contents(
    doc: &mut Document,
    page_id: ObjectId,
    contents: Vec<Object>,
) -> Result<(), PdfToolError> {
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Insert a new content stream before all existing page content
pub fn prepend_content(
    doc: &mut Document,
    page_id: ObjectId,
    bytes: Vec<u8>,
) -> Result<(), PdfToolError> {
    let mut contents = content_references(doc, page_id)?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
    contents.insert(0, Object::Reference(stream_id));
    set_contents(doc, page_id, contents)
}

/// Add a new content stream after all existing page content
pub fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    bytes: Vec<u8>,
) -> Result<(), PdfToolError> {
    let mut contents = content_references(doc, page_id)?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
    contents.push(Object::Reference(stream_id));
    set_contents(doc, page_id, contents)
}

/// Bracket the existing content in `q … Q` so graphics state it leaves
/// behind does not apply to anything appended afterwards
pub fn isolate_existing_content(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfToolError> {
    prepend_content(doc, page_id, encode_operations(vec![Operation::new("q", vec![])])?)?;
    append_content(doc, page_id, encode_operations(vec![Operation::new("Q", vec![])])?)
}

/// Register a font under `name` in the page's own resource dictionary.
///
/// Inherited or indirect resources are copied onto the page first so the
/// new entry never leaks into sibling pages sharing the same dictionary.
pub fn register_font(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    font_id: ObjectId,
) -> Result<(), PdfToolError> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font").ok().and_then(|f| resolve(doc, f)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(name, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with_inherited_box() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET\n".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
                "Resources" => resources_id,
            }),
        );
        (doc, page_id)
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let (doc, page_id) = doc_with_inherited_box();
        let rect = effective_media_box(&doc, page_id).unwrap();
        assert_eq!(rect.width, 300.0);
        assert_eq!(rect.height, 400.0);
    }

    #[test]
    fn test_prepend_and_append_keep_order() {
        let (mut doc, page_id) = doc_with_inherited_box();
        prepend_content(&mut doc, page_id, b"1 0 0 1 0 0 cm\n".to_vec()).unwrap();
        append_content(&mut doc, page_id, b"0 g\n".to_vec()).unwrap();

        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        let cm = text.find("cm").unwrap();
        let bt = text.find("BT").unwrap();
        let g = text.find(" g").unwrap();
        assert!(cm < bt && bt < g, "unexpected order: {}", text);
    }

    #[test]
    fn test_register_font_keeps_inherited_fonts() {
        let (mut doc, page_id) = doc_with_inherited_box();
        let helv = doc.add_object(dictionary! { "Type" => "Font" });
        register_font(&mut doc, page_id, "Overlay", helv).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert_eq!(fonts.get(b"Overlay").unwrap().as_reference().unwrap(), helv);
    }

    #[test]
    fn test_materialize_copies_inherited_attributes() {
        let (mut doc, page_id) = doc_with_inherited_box();
        materialize_inherited(&mut doc, page_id).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(!page.has(b"Rotate"));
        assert_eq!(page_box(&doc, page_id, b"MediaBox").map(|r| r.height), Some(400.0));
    }

    #[test]
    fn test_set_page_boxes_writes_all_three() {
        let (mut doc, page_id) = doc_with_inherited_box();
        let rect = PdfRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        };
        set_page_boxes(&mut doc, page_id, &rect).unwrap();
        for key in [&b"MediaBox"[..], b"CropBox", b"TrimBox"] {
            assert_eq!(page_box(&doc, page_id, key), Some(rect));
        }
    }
}
