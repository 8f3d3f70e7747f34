//! PDF page transforms, merge, protection and image resize
//!
//! Everything here works on bytes in memory: callers hand over uploaded
//! files and get serialized output back. Document work goes through
//! [`PdfDocument`], an owned handle that is parsed once, mutated in place and
//! consumed on save.

pub mod document;
pub mod error;
pub mod merge;
pub mod operations;
pub mod overlay;
pub mod page;
pub mod protect;
pub mod raster;
pub mod resize;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use document::PdfDocument;
pub use error::PdfToolError;
pub use merge::merge_documents;
pub use operations::{parse_edits, EditInstruction, PdfRect, ResizeSpec};
pub use raster::{resize_image, ResizedImage};

/// Resize every page of `bytes` to `spec` and serialize the result
pub fn resize_pdf(bytes: &[u8], spec: &ResizeSpec) -> Result<Vec<u8>, PdfToolError> {
    spec.validate()?;
    let mut doc = PdfDocument::load(bytes)?;
    doc.resize(spec)?;
    doc.into_bytes()
}

/// Apply text edits to `bytes` and serialize the result
pub fn edit_pdf(bytes: &[u8], edits: &[EditInstruction]) -> Result<Vec<u8>, PdfToolError> {
    let mut doc = PdfDocument::load(bytes)?;
    doc.apply_edits(edits)?;
    doc.into_bytes()
}

/// Protect `bytes` with `password` for both owner and user
pub fn lock_pdf(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfToolError> {
    let mut doc = PdfDocument::load(bytes)?;
    doc.protect(password)?;
    doc.into_bytes()
}

/// Decrypt `bytes` with `password` and save without protection
pub fn unlock_pdf(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfToolError> {
    PdfDocument::load_with_password(bytes, password)?.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::create_test_pdf;

    fn page_count(bytes: &[u8]) -> Result<usize, PdfToolError> {
        Ok(PdfDocument::load(bytes)?.page_count())
    }

    #[test]
    fn test_resize_pdf_rejects_bad_spec_before_parsing() {
        let spec = ResizeSpec {
            width: -1.0,
            height: 10.0,
        };
        assert!(matches!(
            resize_pdf(b"not even a pdf", &spec),
            Err(PdfToolError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_lock_unlock_round_trip() {
        let original = create_test_pdf(1, "Trip");
        let locked = lock_pdf(&original, "pw").unwrap();
        assert!(matches!(page_count(&locked), Err(PdfToolError::Encrypted)));
        let unlocked = unlock_pdf(&locked, "pw").unwrap();
        assert_eq!(page_count(&unlocked).unwrap(), 1);
    }

    #[test]
    fn test_edit_pdf_with_parsed_instructions() {
        let edits = parse_edits(
            r#"[{"pageIndex":0,"x":10,"y":10,"width":50,"height":12,"replacementText":"Hi"}]"#,
        )
        .unwrap();
        let out = edit_pdf(&create_test_pdf(1, "Json"), &edits).unwrap();
        assert_eq!(page_count(&out).unwrap(), 1);
    }
}
