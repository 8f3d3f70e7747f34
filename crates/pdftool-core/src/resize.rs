//! Page resize
//!
//! Every page is scaled uniformly (preserving aspect ratio) to fit inside the
//! target size, about the origin and without translation. The page boxes are
//! then forced to exactly the target size, so any leftover area shows up as
//! blank space on the top or right edge.

use lopdf::content::Operation;
use lopdf::{Document, Object, ObjectId};

use crate::error::PdfToolError;
use crate::operations::{PdfRect, ResizeSpec};
use crate::page;

/// The uniform factor that fits `original` inside `spec`
pub fn uniform_scale(original: &PdfRect, spec: &ResizeSpec) -> f32 {
    (spec.width / original.width).min(spec.height / original.height)
}

/// Resize every page of `doc`.
///
/// All pages are checked before the first one is touched; a page without a
/// usable MediaBox fails the whole operation.
pub fn resize_pages(doc: &mut Document, spec: &ResizeSpec) -> Result<(), PdfToolError> {
    spec.validate()?;

    let mut plan: Vec<(ObjectId, f32)> = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let media_box = page::effective_media_box(doc, page_id).ok_or_else(|| {
            PdfToolError::OperationError(format!("Page {} has no usable MediaBox", page_num))
        })?;
        if media_box.is_degenerate() {
            return Err(PdfToolError::ZeroSizedPage(page_num));
        }
        plan.push((page_id, uniform_scale(&media_box, spec)));
    }

    let target = PdfRect {
        x: 0.0,
        y: 0.0,
        width: spec.width,
        height: spec.height,
    };
    for (page_id, scale) in plan {
        let transform = Operation::new(
            "cm",
            vec![
                Object::Real(scale),
                0.into(),
                0.into(),
                Object::Real(scale),
                0.into(),
                0.into(),
            ],
        );
        page::prepend_content(doc, page_id, page::encode_operations(vec![transform])?)?;
        page::set_page_boxes(doc, page_id, &target)?;
    }

    tracing::debug!(
        width = spec.width,
        height = spec.height,
        pages = doc.get_pages().len(),
        "Resized document pages"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::fixtures::{create_sized_test_pdf, create_test_pdf, page_contents};
    use lopdf::content::Content;
    use proptest::prelude::*;

    /// Scale factor of the first `cm` operator on each page
    fn leading_scales(bytes: &[u8]) -> Vec<f32> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
                let first = &content.operations[0];
                assert_eq!(first.operator, "cm");
                first.operands[0].as_float().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_letter_to_a4_scale() {
        let mut doc = PdfDocument::load(&create_test_pdf(2, "Resize")).unwrap();
        doc.resize(&ResizeSpec::new(595.0, 842.0).unwrap()).unwrap();
        let bytes = doc.into_bytes().unwrap();

        let expected = (595.0f32 / 612.0).min(842.0 / 792.0);
        for scale in leading_scales(&bytes) {
            assert!((scale - expected).abs() < 1e-4, "scale {} != {}", scale, expected);
        }
    }

    #[test]
    fn test_boxes_forced_to_target() {
        let mut doc = PdfDocument::load(&create_sized_test_pdf(1, "Boxes", 200, 100)).unwrap();
        doc.resize(&ResizeSpec::new(400.0, 400.0).unwrap()).unwrap();
        let bytes = doc.into_bytes().unwrap();

        let reloaded = Document::load_mem(&bytes).unwrap();
        let page_id = reloaded.get_pages()[&1];
        let target = PdfRect {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 400.0,
        };
        for key in [&b"MediaBox"[..], b"CropBox", b"TrimBox"] {
            assert_eq!(page::page_box(&reloaded, page_id, key), Some(target));
        }
    }

    #[test]
    fn test_existing_content_follows_transform() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Order")).unwrap();
        doc.resize(&ResizeSpec::new(300.0, 300.0).unwrap()).unwrap();
        let contents = page_contents(&doc.into_bytes().unwrap());

        let cm = contents[0].find("cm").unwrap();
        let text = contents[0].find("Order-Page-1").unwrap();
        assert!(cm < text);
    }

    #[test]
    fn test_zero_sized_page_fails_without_mutation() {
        let mut doc = PdfDocument::load(&create_sized_test_pdf(2, "Flat", 612, 0)).unwrap();
        let err = doc.resize(&ResizeSpec::new(100.0, 100.0).unwrap()).unwrap_err();
        assert!(matches!(err, PdfToolError::ZeroSizedPage(1)));

        let page_id = doc.page_ids()[0];
        assert_eq!(doc.inner().get_page_contents(page_id).len(), 1);
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Bad")).unwrap();
        let spec = ResizeSpec {
            width: 0.0,
            height: 100.0,
        };
        assert!(matches!(
            doc.resize(&spec),
            Err(PdfToolError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_page_count_unchanged() {
        let mut doc = PdfDocument::load(&create_test_pdf(4, "Count")).unwrap();
        doc.resize(&ResizeSpec::new(842.0, 595.0).unwrap()).unwrap();
        assert_eq!(doc.page_count(), 4);
    }

    proptest! {
        #[test]
        fn prop_scale_fits_target(
            w0 in 1.0f32..2000.0,
            h0 in 1.0f32..2000.0,
            w in 1.0f32..2000.0,
            h in 1.0f32..2000.0,
        ) {
            let original = PdfRect { x: 0.0, y: 0.0, width: w0, height: h0 };
            let spec = ResizeSpec::new(w, h).unwrap();
            let scale = uniform_scale(&original, &spec);

            prop_assert!(scale > 0.0);
            prop_assert!(w0 * scale <= w * 1.0001);
            prop_assert!(h0 * scale <= h * 1.0001);
            // One axis fills the target exactly
            let fills_w = (w0 * scale - w).abs() <= w * 1e-4;
            let fills_h = (h0 * scale - h).abs() <= h * 1e-4;
            prop_assert!(fills_w || fills_h);
        }

        #[test]
        fn prop_resize_sets_boxes_on_every_page(
            w in 1u16..3000,
            h in 1u16..3000,
            pages in 1u32..4,
        ) {
            let mut doc = PdfDocument::load(&create_test_pdf(pages, "Prop")).unwrap();
            doc.resize(&ResizeSpec::new(w as f32, h as f32).unwrap()).unwrap();
            let bytes = doc.into_bytes().unwrap();

            let reloaded = Document::load_mem(&bytes).unwrap();
            let target = PdfRect { x: 0.0, y: 0.0, width: w as f32, height: h as f32 };
            for page_id in reloaded.get_pages().into_values() {
                prop_assert_eq!(page::page_box(&reloaded, page_id, b"MediaBox"), Some(target));
                prop_assert_eq!(page::page_box(&reloaded, page_id, b"CropBox"), Some(target));
                prop_assert_eq!(page::page_box(&reloaded, page_id, b"TrimBox"), Some(target));
            }

            let expected = (w as f32 / 612.0).min(h as f32 / 792.0);
            for scale in leading_scales(&bytes) {
                prop_assert!((scale - expected).abs() <= expected * 1e-4);
            }
        }
    }
}
