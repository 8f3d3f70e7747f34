//! Owned in-memory PDF handle
//!
//! A `PdfDocument` is created by parsing bytes, mutated through `&mut self`
//! transform passes, and consumed by [`PdfDocument::into_bytes`]. Nothing is
//! serialized until every pass has succeeded, so a failed request never
//! produces partial output.

use lopdf::{Document, ObjectId};
use sha2::{Digest, Sha256};

use crate::error::PdfToolError;
use crate::operations::{EditInstruction, ResizeSpec};
use crate::{overlay, protect, resize};

pub struct PdfDocument {
    inner: Document,
    /// SHA-256 of the bytes the document was parsed from
    fingerprint: [u8; 32],
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.page_count())
            .field("version", &self.inner.version)
            .finish()
    }
}

impl PdfDocument {
    /// Parse an unprotected document.
    ///
    /// Any protected document is rejected with [`PdfToolError::Encrypted`],
    /// including one the reader could open with the empty user password;
    /// use [`PdfDocument::load_with_password`].
    pub fn load(bytes: &[u8]) -> Result<Self, PdfToolError> {
        let inner = Document::load_mem(bytes).map_err(|e| PdfToolError::ParseError(e.to_string()))?;
        if inner.is_encrypted() || inner.was_encrypted() {
            return Err(PdfToolError::Encrypted);
        }
        Ok(Self::from_parts(inner, bytes))
    }

    /// Parse a document, decrypting it with `password` if it is protected.
    ///
    /// On success the returned handle carries no protection: the `/Encrypt`
    /// dictionary has already been stripped. Unprotected input loads as if
    /// through [`PdfDocument::load`].
    pub fn load_with_password(bytes: &[u8], password: &str) -> Result<Self, PdfToolError> {
        let inner = Document::load_mem_with_password(bytes, password).map_err(|e| match e {
            lopdf::Error::InvalidPassword
            | lopdf::Error::Decryption(lopdf::encryption::DecryptionError::IncorrectPassword) => {
                PdfToolError::AuthenticationFailed
            }
            other => PdfToolError::ParseError(other.to_string()),
        })?;
        if inner.is_encrypted() {
            return Err(PdfToolError::AuthenticationFailed);
        }
        protect::verify_password(&inner, password)?;
        let mut doc = Self::from_parts(inner, bytes);
        doc.remove_protection();
        Ok(doc)
    }

    fn from_parts(inner: Document, source: &[u8]) -> Self {
        Self {
            inner,
            fingerprint: Sha256::digest(source).into(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    pub fn is_encrypted(&self) -> bool {
        self.inner.is_encrypted()
    }

    /// Read-only access to the underlying object graph
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Scale every page to fit `spec` and force its boxes to `[0 0 W H]`
    pub fn resize(&mut self, spec: &ResizeSpec) -> Result<(), PdfToolError> {
        resize::resize_pages(&mut self.inner, spec)
    }

    /// Whiteout-and-redraw each instruction in order
    pub fn apply_edits(&mut self, edits: &[EditInstruction]) -> Result<(), PdfToolError> {
        overlay::apply_edits(&mut self.inner, edits)
    }

    /// Encrypt with `password` as both owner and user password
    pub fn protect(&mut self, password: &str) -> Result<(), PdfToolError> {
        protect::protect(&mut self.inner, password, &self.fingerprint)
    }

    /// Drop any leftover security handler so the saved file is plain
    pub fn remove_protection(&mut self) {
        protect::strip_encryption(&mut self.inner);
    }

    pub(crate) fn into_document(self) -> Document {
        self.inner
    }

    /// Serialize the document, consuming the handle
    pub fn into_bytes(self) -> Result<Vec<u8>, PdfToolError> {
        save(self.inner)
    }
}

pub(crate) fn save(mut doc: Document) -> Result<Vec<u8>, PdfToolError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolError::SerializationError(e.to_string()))?;
    Ok(buffer)
}
