//! Per-user activity log
//!
//! One line per successful operation, appended to a plain text file.
//! Logging is best effort: a write failure is reported through `tracing`
//! and never fails the request that triggered it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, SecondsFormat};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MergedPdfs,
    ResizedImage,
    ResizedPdf,
    LockedPdf,
    UnlockedPdf,
    ConvertedDocToPdf,
    EditedPdfText,
    ConvertedHtmlToPdf,
    ConvertedPdfToHtml,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::MergedPdfs => "Merged PDFs",
            Action::ResizedImage => "Resized Image",
            Action::ResizedPdf => "Resized PDF",
            Action::LockedPdf => "Locked PDF",
            Action::UnlockedPdf => "Unlocked PDF",
            Action::ConvertedDocToPdf => "Converted DOC to PDF",
            Action::EditedPdfText => "Edited PDF Text",
            Action::ConvertedHtmlToPdf => "Converted HTML to PDF",
            Action::ConvertedPdfToHtml => "Converted PDF to HTML",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: Arc<PathBuf>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry for `user`
    pub async fn record(&self, user: &str, action: Action, file: &str) {
        let line = format_entry(Local::now(), user, action, file);
        if let Err(e) = self.append(&line).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write history entry"
            );
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// `[<timestamp>] User: <user> | Action: <action> | File: <file>` plus newline
pub fn format_entry(at: DateTime<Local>, user: &str, action: Action, file: &str) -> String {
    format!(
        "[{}] User: {} | Action: {} | File: {}\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, false),
        single_line(user),
        action,
        single_line(file)
    )
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
