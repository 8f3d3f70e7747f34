//! Password protection
//!
//! Documents are locked with the standard security handler (RC4, 128-bit
//! key, revision 3) using one password for both the owner and user roles and
//! granting every permission.

use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};

use crate::error::PdfToolError;

const KEY_LENGTH_BITS: usize = 128;

/// Encrypt `doc` in place.
///
/// Key derivation needs a trailer `/ID`; when the document has none, one is
/// derived from `fingerprint` (a digest of the source bytes).
pub fn protect(doc: &mut Document, password: &str, fingerprint: &[u8; 32]) -> Result<(), PdfToolError> {
    encrypt(doc, password, password, fingerprint)
}

fn encrypt(
    doc: &mut Document,
    owner_password: &str,
    user_password: &str,
    fingerprint: &[u8; 32],
) -> Result<(), PdfToolError> {
    if doc.is_encrypted() {
        return Err(PdfToolError::Encrypted);
    }
    ensure_file_id(doc, fingerprint);

    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password,
        user_password,
        key_length: KEY_LENGTH_BITS,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|e| PdfToolError::OperationError(format!("Failed to derive encryption key: {}", e)))?;
    doc.encrypt(&state)
        .map_err(|e| PdfToolError::OperationError(format!("Failed to encrypt document: {}", e)))?;

    tracing::debug!(objects = doc.objects.len(), "Encrypted document");
    Ok(())
}

/// Check `password` against the security handler `doc` was decrypted with.
///
/// The reader falls back to the empty user password on its own, so a
/// document protected only by an owner password loads whatever password is
/// supplied. The handler is rebuilt from the retained decryption state and
/// the supplied password must open it as owner or user. Documents that were
/// never protected accept any password.
pub fn verify_password(doc: &Document, password: &str) -> Result<(), PdfToolError> {
    let Some(state) = doc.encryption_state.as_ref() else {
        return Ok(());
    };
    let handler = state
        .encode()
        .map_err(|e| PdfToolError::OperationError(format!("Failed to read security handler: {}", e)))?;

    let mut scratch = Document::new();
    let handler_id = scratch.add_object(handler);
    scratch.trailer.set("Encrypt", Object::Reference(handler_id));
    if let Ok(file_id) = doc.trailer.get(b"ID") {
        scratch.trailer.set("ID", file_id.clone());
    }

    scratch
        .authenticate_password(password)
        .map_err(|_| PdfToolError::AuthenticationFailed)
}

/// Remove the `/Encrypt` trailer entry and its dictionary
pub fn strip_encryption(doc: &mut Document) {
    if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
        doc.objects.remove(&id);
    }
    doc.encryption_state = None;
}

fn ensure_file_id(doc: &mut Document, fingerprint: &[u8; 32]) {
    let has_id = doc
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .map(|ids| ids.first().and_then(|id| id.as_str().ok()).is_some())
        .unwrap_or(false);
    if has_id {
        return;
    }
    let id = fingerprint[..16].to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::fixtures::{create_test_pdf, page_contents};
    use crate::page;
    use pretty_assertions::assert_eq;

    fn locked(pages: u32, password: &str) -> (Vec<u8>, Vec<u8>) {
        let original = create_test_pdf(pages, "Secret");
        let mut doc = PdfDocument::load(&original).unwrap();
        doc.protect(password).unwrap();
        (original, doc.into_bytes().unwrap())
    }

    #[test]
    fn test_locked_document_requires_password() {
        let (_, bytes) = locked(1, "hunter2");
        assert!(matches!(
            PdfDocument::load(&bytes),
            Err(PdfToolError::Encrypted)
        ));
    }

    #[test]
    fn test_lock_then_unlock_restores_content() {
        let (original, bytes) = locked(2, "hunter2");

        let doc = PdfDocument::load_with_password(&bytes, "hunter2").unwrap();
        assert!(!doc.is_encrypted());
        assert_eq!(doc.page_count(), 2);
        let unlocked = doc.into_bytes().unwrap();

        assert!(!unlocked.windows(8).any(|w| w == b"/Encrypt"));
        assert_eq!(page_contents(&unlocked), page_contents(&original));

        let plain = PdfDocument::load(&unlocked).unwrap();
        let boxes: Vec<_> = plain
            .page_ids()
            .into_iter()
            .map(|id| page::effective_media_box(plain.inner(), id))
            .collect();
        let expected = Some(crate::operations::PdfRect {
            x: 0.0,
            y: 0.0,
            width: 612.0,
            height: 792.0,
        });
        assert_eq!(boxes, vec![expected, expected]);
    }

    #[test]
    fn test_wrong_password_is_authentication_failure() {
        let (_, bytes) = locked(1, "right");
        assert!(matches!(
            PdfDocument::load_with_password(&bytes, "wrong"),
            Err(PdfToolError::AuthenticationFailed)
        ));
    }

    fn owner_only(owner: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(&create_test_pdf(1, "Owner")).unwrap();
        encrypt(&mut doc, owner, "", &[3u8; 32]).unwrap();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_owner_only_protection_checks_password() {
        let bytes = owner_only("owner");
        assert!(matches!(
            PdfDocument::load_with_password(&bytes, "nope"),
            Err(PdfToolError::AuthenticationFailed)
        ));

        let doc = PdfDocument::load_with_password(&bytes, "owner").unwrap();
        assert!(!doc.is_encrypted());
        let unlocked = doc.into_bytes().unwrap();
        assert!(!unlocked.windows(8).any(|w| w == b"/Encrypt"));
        assert!(page_contents(&unlocked)[0].contains("Owner-Page-1"));
    }

    #[test]
    fn test_owner_only_protection_rejected_without_password() {
        let bytes = owner_only("owner");
        assert!(matches!(
            PdfDocument::load(&bytes),
            Err(PdfToolError::Encrypted)
        ));
        let spec = crate::operations::ResizeSpec::new(100.0, 100.0).unwrap();
        assert!(matches!(
            crate::resize_pdf(&bytes, &spec),
            Err(PdfToolError::Encrypted)
        ));
    }

    #[test]
    fn test_verify_password_ignores_plain_documents() {
        let doc = Document::load_mem(&create_test_pdf(1, "Plain")).unwrap();
        assert!(verify_password(&doc, "anything").is_ok());
    }

    #[test]
    fn test_unlocking_plain_document_is_harmless() {
        let original = create_test_pdf(1, "Open");
        let doc = PdfDocument::load_with_password(&original, "whatever").unwrap();
        let bytes = doc.into_bytes().unwrap();
        assert_eq!(page_contents(&bytes), page_contents(&original));
    }

    #[test]
    fn test_file_id_synthesized_once() {
        let mut doc = Document::with_version("1.5");
        ensure_file_id(&mut doc, &[7u8; 32]);
        let first = doc.trailer.get(b"ID").unwrap().clone();
        ensure_file_id(&mut doc, &[9u8; 32]);
        assert_eq!(doc.trailer.get(b"ID").unwrap(), &first);
        assert_eq!(first.as_array().unwrap()[0].as_str().unwrap(), &[7u8; 16][..]);
    }

    #[test]
    fn test_protect_twice_fails() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Twice")).unwrap();
        doc.protect("a").unwrap();
        assert!(matches!(doc.protect("b"), Err(PdfToolError::Encrypted)));
    }
}
