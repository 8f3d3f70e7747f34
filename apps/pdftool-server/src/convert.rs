//! Client for the external document conversion API
//!
//! Each conversion posts a single multipart file part and authenticates with
//! an `Apikey` header. Failures are not retried, and requests run under
//! reqwest's transport defaults rather than the processing timeout.

use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::error::ServerError;

const DOCX_TO_PDF: &str = "/convert/docx/to/pdf";
const HTML_TO_PDF: &str = "/convert/html/to/pdf";
const PDF_TO_HTML: &str = "/convert/pdf/to/html";

#[derive(Clone)]
pub struct ConversionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ConversionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ConversionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub async fn docx_to_pdf(&self, bytes: Vec<u8>, file_name: &str) -> Result<Vec<u8>, ServerError> {
        let response = self.post_file(DOCX_TO_PDF, "file", bytes, file_name).await?;
        read_bytes(response).await
    }

    pub async fn html_to_pdf(&self, bytes: Vec<u8>, file_name: &str) -> Result<Vec<u8>, ServerError> {
        let response = self.post_file(HTML_TO_PDF, "inputFile", bytes, file_name).await?;
        read_bytes(response).await
    }

    pub async fn pdf_to_html(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, ServerError> {
        let response = self.post_file(PDF_TO_HTML, "file", bytes, file_name).await?;
        response
            .text()
            .await
            .map_err(|e| ServerError::ConversionFailed(format!("Failed to read converted HTML: {}", e)))
    }

    async fn post_file(
        &self,
        path: &str,
        part_name: &'static str,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<reqwest::Response, ServerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, size = bytes.len(), "Sending conversion request");

        let form = Form::new().part(part_name, Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self
            .http
            .post(&url)
            .header("Apikey", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServerError::ConversionFailed(format!("Conversion service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Conversion service returned an error");
            return Err(ServerError::ConversionFailed(format!(
                "Conversion service responded with status {}",
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

async fn read_bytes(response: reqwest::Response) -> Result<Vec<u8>, ServerError> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ServerError::ConversionFailed(format!("Failed to read converted file: {}", e)))
}
