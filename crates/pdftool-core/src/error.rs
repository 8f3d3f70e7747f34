use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Document is encrypted; a password is required")]
    Encrypted,

    #[error("Incorrect password for encrypted document")]
    AuthenticationFailed,

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Page index {index} is out of range for a document with {page_count} page(s)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Page {0} has a zero-sized MediaBox")]
    ZeroSizedPage(u32),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Text cannot be drawn with the built-in font: {0}")]
    UnsupportedText(String),

    #[error("No documents to merge")]
    NoDocuments,

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

