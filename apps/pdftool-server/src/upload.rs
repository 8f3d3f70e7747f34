//! Multipart upload collection
//!
//! Every endpoint takes a `multipart/form-data` body. Parts carrying a file
//! name are collected as files (a field may repeat, as `files` does for
//! merge); all other parts are read as UTF-8 text. Text lookups fall back to
//! a same-named file part, since browsers send a `Blob` (JSON edits, for
//! instance) with a file name attached.

use std::collections::HashMap;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::ServerError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, Vec<UploadedFile>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| {
                        ServerError::InvalidRequest(format!("Failed to read file '{}': {}", name, e))
                    })?;
                    form.files
                        .entry(name)
                        .or_default()
                        .push(UploadedFile { file_name, bytes });
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        ServerError::InvalidRequest(format!("Failed to read field '{}': {}", name, e))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// The first file uploaded under `name`
    pub fn file(&self, name: &str) -> Result<UploadedFile, ServerError> {
        self.files
            .get(name)
            .and_then(|files| files.first())
            .cloned()
            .ok_or_else(|| ServerError::InvalidRequest(format!("Missing file field '{}'", name)))
    }

    /// Every file uploaded under `name`, in upload order
    pub fn files(&self, name: &str) -> Vec<UploadedFile> {
        self.files.get(name).cloned().unwrap_or_default()
    }

    pub fn text(&self, name: &str) -> Result<&str, ServerError> {
        if let Some(value) = self.fields.get(name) {
            return Ok(value);
        }
        let file = self
            .files
            .get(name)
            .and_then(|files| files.first())
            .ok_or_else(|| ServerError::InvalidRequest(format!("Missing field '{}'", name)))?;
        std::str::from_utf8(&file.bytes)
            .map_err(|_| ServerError::InvalidRequest(format!("Field '{}' is not valid UTF-8", name)))
    }

    /// Parse a text field, e.g. a numeric dimension
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ServerError> {
        let raw = self.text(name)?;
        raw.trim().parse().map_err(|_| {
            ServerError::InvalidRequest(format!("Field '{}' has an invalid value: {:?}", name, raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_file(name: &str, bytes: &'static [u8]) -> UploadForm {
        let mut form = UploadForm::default();
        form.files.entry(name.to_string()).or_default().push(UploadedFile {
            file_name: "blob".to_string(),
            bytes: Bytes::from_static(bytes),
        });
        form
    }

    #[test]
    fn test_text_prefers_plain_field() {
        let mut form = form_with_file("edits", b"[1]");
        form.fields.insert("edits".to_string(), "[]".to_string());
        assert_eq!(form.text("edits").unwrap(), "[]");
    }

    #[test]
    fn test_text_falls_back_to_file_part() {
        let form = form_with_file("edits", b"[{\"pageIndex\":0}]");
        assert_eq!(form.text("edits").unwrap(), "[{\"pageIndex\":0}]");
    }

    #[test]
    fn test_text_rejects_binary_file_part() {
        let form = form_with_file("width", &[0xff, 0xfe, 0x00]);
        assert!(matches!(form.text("width"), Err(ServerError::InvalidRequest(_))));
    }

    #[test]
    fn test_missing_text_and_file() {
        let form = UploadForm::default();
        assert!(matches!(form.text("password"), Err(ServerError::InvalidRequest(_))));
        assert!(matches!(form.file("file"), Err(ServerError::InvalidRequest(_))));
        assert!(form.files("files").is_empty());
    }

    #[test]
    fn test_parse_trims_numbers() {
        let mut form = UploadForm::default();
        form.fields.insert("width".to_string(), " 640 ".to_string());
        assert_eq!(form.parse::<u32>("width").unwrap(), 640);
        form.fields.insert("height".to_string(), "tall".to_string());
        assert!(form.parse::<u32>("height").is_err());
    }
}
