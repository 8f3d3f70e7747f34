//! In-memory PDFs for tests
//!
//! Enabled for this crate's own tests and, through the `fixtures` feature,
//! for downstream test suites.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// A US Letter document with `num_pages` pages, each showing
/// `<prefix>-Page-<n>` in Helvetica
pub fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    create_sized_test_pdf(num_pages, content_prefix, 612, 792)
}

/// Same as [`create_test_pdf`] with an explicit MediaBox of `width × height`
pub fn create_sized_test_pdf(num_pages: u32, content_prefix: &str, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::new();
    for page_num in 0..num_pages {
        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET\n",
            content_prefix,
            page_num + 1
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        });
        page_ids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => num_pages as i64,
            "Kids" => page_ids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("in-memory save cannot fail");
    buffer
}

/// Decoded content of every page, concatenated per page, in page order
pub fn page_contents(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("fixture output must parse");
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap_or_default()).into_owned())
        .collect()
}
