//! API handlers for the pdftool server
//!
//! Every `/api/pdf/*` endpoint takes a multipart upload and answers with the
//! transformed file as an attachment. Document and image work runs on the
//! blocking pool under the configured timeout; conversions are delegated to
//! the external conversion API.

use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use pdftool_core::{parse_edits, PdfToolError, ResizeSpec};
use serde::Serialize;
use tracing::info;

use crate::convert::ConversionClient;
use crate::error::ServerError;
use crate::history::Action;
use crate::state::{AppState, Caller};
use crate::upload::{UploadForm, UploadedFile};

const PDF: &str = "application/pdf";
const HTML: &str = "text/html; charset=utf-8";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftool-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/pdf/merge
pub async fn handle_merge(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let files = form.files("files");
    if files.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Upload at least one PDF in the 'files' field".into(),
        ));
    }
    info!("Merge request: {} files", files.len());

    let count = files.len();
    let inputs: Vec<Vec<u8>> = files.into_iter().map(|f| f.bytes.to_vec()).collect();
    let merged = run_blocking(state.timeout_ms, move || pdftool_core::merge_documents(inputs)).await?;

    state
        .history
        .record(&user, Action::MergedPdfs, &format!("{} files", count))
        .await;
    Ok(attachment(merged, PDF, "merged.pdf"))
}

/// Handler: POST /api/pdf/resize-image
pub async fn handle_resize_image(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let UploadedFile { file_name, bytes } = form.file("file")?;
    let width: u32 = form.parse("width")?;
    let height: u32 = form.parse("height")?;
    info!("Resize image request: {} to {}x{}", file_name, width, height);

    let target = file_name.clone();
    let resized = run_blocking(state.timeout_ms, move || {
        pdftool_core::resize_image(&bytes, &target, width, height)
    })
    .await?;

    state
        .history
        .record(&user, Action::ResizedImage, &file_name)
        .await;
    let content_type = resized.mime_type();
    let download = format!("resized.{}", resized.extension());
    Ok(attachment(resized.bytes, content_type, &download))
}

/// Handler: POST /api/pdf/resize-pdf
pub async fn handle_resize_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    let spec = ResizeSpec::new(form.parse("width")?, form.parse("height")?)?;
    info!(
        "Resize PDF request: {} to {}x{}pt",
        file.file_name, spec.width, spec.height
    );

    let bytes = file.bytes.clone();
    let resized = run_blocking(state.timeout_ms, move || pdftool_core::resize_pdf(&bytes, &spec)).await?;

    state
        .history
        .record(&user, Action::ResizedPdf, &file.file_name)
        .await;
    Ok(attachment(resized, PDF, "resized.pdf"))
}

/// Handler: POST /api/pdf/lock-pdf
pub async fn handle_lock_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    let password = required_password(&form)?;
    info!("Lock request: {}", file.file_name);

    let bytes = file.bytes.clone();
    let locked = run_blocking(state.timeout_ms, move || pdftool_core::lock_pdf(&bytes, &password)).await?;

    state
        .history
        .record(&user, Action::LockedPdf, &file.file_name)
        .await;
    Ok(attachment(locked, PDF, "locked.pdf"))
}

/// Handler: POST /api/pdf/unlock-pdf
pub async fn handle_unlock_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    let password = required_password(&form)?;
    info!("Unlock request: {}", file.file_name);

    let bytes = file.bytes.clone();
    let unlocked =
        run_blocking(state.timeout_ms, move || pdftool_core::unlock_pdf(&bytes, &password)).await?;

    state
        .history
        .record(&user, Action::UnlockedPdf, &file.file_name)
        .await;
    Ok(attachment(unlocked, PDF, "unlocked.pdf"))
}

/// Handler: POST /api/pdf/edit-pdf
pub async fn handle_edit_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    let edits = parse_edits(form.text("edits")?)?;
    info!("Edit request: {} with {} edits", file.file_name, edits.len());

    let bytes = file.bytes.clone();
    let edited = run_blocking(state.timeout_ms, move || pdftool_core::edit_pdf(&bytes, &edits)).await?;

    state
        .history
        .record(&user, Action::EditedPdfText, &file.file_name)
        .await;
    Ok(attachment(edited, PDF, "edited.pdf"))
}

/// Handler: POST /api/pdf/convert-doc-to-pdf
pub async fn handle_convert_doc_to_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let converter = converter(&state)?;
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    info!("DOC to PDF request: {}", file.file_name);

    let pdf = converter
        .docx_to_pdf(file.bytes.to_vec(), &file.file_name)
        .await?;

    state
        .history
        .record(&user, Action::ConvertedDocToPdf, &file.file_name)
        .await;
    Ok(attachment(pdf, PDF, "converted.pdf"))
}

/// Handler: POST /api/pdf/html-to-pdf
pub async fn handle_html_to_pdf(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let converter = converter(&state)?;
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("html")?;
    info!("HTML to PDF request: {}", file.file_name);

    let pdf = converter
        .html_to_pdf(file.bytes.to_vec(), &file.file_name)
        .await?;

    state
        .history
        .record(&user, Action::ConvertedHtmlToPdf, &file.file_name)
        .await;
    Ok(attachment(pdf, PDF, "converted.pdf"))
}

/// Handler: POST /api/pdf/pdf-to-html
pub async fn handle_pdf_to_html(
    State(state): State<AppState>,
    Caller(user): Caller,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let converter = converter(&state)?;
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.file("file")?;
    info!("PDF to HTML request: {}", file.file_name);

    let html = converter
        .pdf_to_html(file.bytes.to_vec(), &file.file_name)
        .await?;

    state
        .history
        .record(&user, Action::ConvertedPdfToHtml, &file.file_name)
        .await;
    Ok(attachment(html.into_bytes(), HTML, "converted.html"))
}

fn converter(state: &AppState) -> Result<ConversionClient, ServerError> {
    state
        .converter
        .clone()
        .ok_or(ServerError::ConversionUnavailable)
}

fn required_password(form: &UploadForm) -> Result<String, ServerError> {
    let password = form.text("password")?;
    if password.is_empty() {
        return Err(ServerError::InvalidRequest("Password must not be empty".into()));
    }
    Ok(password.to_string())
}

/// Run CPU-bound work on the blocking pool, bounded by `timeout_ms`
///
/// A blocking task cannot be cancelled: on timeout the caller gets
/// [`ServerError::Timeout`] while the detached task runs to completion and
/// its output is dropped. Nothing it produces ever reaches a response.
async fn run_blocking<T, F>(timeout_ms: u64, task: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, PdfToolError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(task),
    )
    .await;

    match result {
        Ok(Ok(output)) => output.map_err(ServerError::from),
        Ok(Err(join_error)) => Err(ServerError::Internal(format!(
            "Processing task panicked: {}",
            join_error
        ))),
        Err(_timeout) => Err(ServerError::Timeout(timeout_ms)),
    }
}

/// A downloadable file response
fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}
