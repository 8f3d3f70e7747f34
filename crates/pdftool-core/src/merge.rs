//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::document::{save, PdfDocument};
use crate::error::PdfToolError;
use crate::page;
use lopdf::{Document, Object, ObjectId};

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load every input, in order
/// 3. Use the first document as the destination
/// 4. For each remaining document:
///    a. Offset its object IDs past the destination's highest ID
///    b. Import all objects with remapped IDs
///    c. Append its pages to the destination page list
/// 5. Point the destination page tree at the combined page list
/// 6. Compress and return the merged result
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfToolError> {
    if documents.is_empty() {
        return Err(PdfToolError::NoDocuments);
    }

    let mut loaded_docs = Vec::with_capacity(documents.len());
    for (i, doc_bytes) in documents.iter().enumerate() {
        let doc = PdfDocument::load(doc_bytes).map_err(|e| match e {
            PdfToolError::ParseError(msg) => {
                PdfToolError::ParseError(format!("Failed to load document {}: {}", i, msg))
            }
            other => other,
        })?;
        loaded_docs.push(doc.into_document());
    }

    let mut loaded_docs = loaded_docs.into_iter();
    let Some(mut dest) = loaded_docs.next() else {
        return Err(PdfToolError::NoDocuments);
    };
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);

    for source in loaded_docs {
        // Collect pages before the object table is consumed
        let source_pages = get_page_references(&source);
        let id_offset = dest_max_id;

        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|old_page_ref| (old_page_ref.0 + id_offset, old_page_ref.1)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;
    dest.compress();

    tracing::debug!(
        inputs = documents.len(),
        pages = dest_page_refs.len(),
        "Merged documents"
    );
    save(dest)
}

/// Get all page object references from a document, in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination page tree root at `page_refs` and re-parent every
/// page to it
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfToolError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Pages in catalog".into()))?;

    let pages_dict = doc
        .get_dictionary_mut(pages_id)
        .map_err(|_| PdfToolError::OperationError("Invalid pages dictionary".into()))?;
    let kids = page_refs
        .iter()
        .map(|&id| Object::Reference(id))
        .collect::<Vec<_>>();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    // Pages from later documents still point at their own (now orphaned)
    // page tree roots
    for &page_id in page_refs {
        page::materialize_inherited(doc, page_id)?;
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
