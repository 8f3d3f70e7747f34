//! Request types for page transforms and text edits
//!
//! These are the values a caller hands to the transform engine: a target
//! page size for resizing, and a list of rectangular text patches for
//! editing. Both validate themselves before any document is touched.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PdfToolError;

/// Axis-aligned rectangle in PDF user space (points, origin bottom-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfRect {
    /// Build a rect from a PDF box array `[llx lly urx ury]`.
    ///
    /// Corners may be given in any order; width and height are always
    /// non-negative.
    pub fn from_box(values: &[f32; 4]) -> Self {
        let [x0, y0, x1, y1] = *values;
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Target page size for a resize, in points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResizeSpec {
    pub width: f32,
    pub height: f32,
}

impl ResizeSpec {
    pub fn new(width: f32, height: f32) -> Result<Self, PdfToolError> {
        let spec = Self { width, height };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), PdfToolError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if positive(self.width) && positive(self.height) {
            Ok(())
        } else {
            Err(PdfToolError::InvalidDimensions(format!(
                "width and height must be positive, got {} x {}",
                self.width, self.height
            )))
        }
    }
}

/// One whiteout-and-redraw patch.
///
/// The wire names follow the JSON clients send (`pageIndex`,
/// `replacementText`); the older `pageNumber` / `newText` names are accepted
/// as aliases. `pageIndex` is 0-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditInstruction {
    #[serde(alias = "pageNumber")]
    pub page_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, alias = "newText", deserialize_with = "null_as_empty")]
    pub replacement_text: String,
}

impl EditInstruction {
    pub fn rect(&self) -> PdfRect {
        PdfRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Check the instruction against a document with `page_count` pages
    pub fn validate(&self, page_count: usize) -> Result<(), PdfToolError> {
        if self.page_index >= page_count {
            return Err(PdfToolError::PageOutOfRange {
                index: self.page_index,
                page_count,
            });
        }
        if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(PdfToolError::InvalidEdit(
                "coordinates must be finite numbers".into(),
            ));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(PdfToolError::InvalidEdit(format!(
                "rectangle size must be non-negative, got {} x {}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse the JSON array of edit instructions sent by clients
pub fn parse_edits(json: &str) -> Result<Vec<EditInstruction>, PdfToolError> {
    serde_json::from_str(json)
        .map_err(|e| PdfToolError::InvalidEdit(format!("malformed edits JSON: {}", e)))
}
