//! Raster image resize

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};

use crate::error::PdfToolError;

const JPEG_QUALITY: u8 = 90;

/// Encoded output of [`resize_image`]
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ResizedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Preferred file extension for the output format
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("png")
    }
}

/// Output format implied by the uploaded file name; PNG when the extension is
/// missing or not one we encode
pub fn output_format_for(file_name: &str) -> ImageFormat {
    Path::new(file_name)
        .extension()
        .and_then(ImageFormat::from_extension)
        .filter(|f| {
            matches!(
                f,
                ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Bmp
            )
        })
        .unwrap_or(ImageFormat::Png)
}

/// Decode `bytes`, stretch to exactly `width × height` and re-encode in the
/// format implied by `file_name`
pub fn resize_image(
    bytes: &[u8],
    file_name: &str,
    width: u32,
    height: u32,
) -> Result<ResizedImage, PdfToolError> {
    if width == 0 || height == 0 {
        return Err(PdfToolError::InvalidDimensions(format!(
            "image size must be positive, got {} x {}",
            width, height
        )));
    }

    let source = image::load_from_memory(bytes).map_err(|e| PdfToolError::ImageError(e.to_string()))?;
    // Flatten onto RGB; transparency is not carried over
    let resized = DynamicImage::ImageRgb8(
        source
            .resize_exact(width, height, FilterType::Lanczos3)
            .into_rgb8(),
    );

    let format = output_format_for(file_name);
    let output = match format {
        ImageFormat::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
        ImageFormat::Gif => ImageOutputFormat::Gif,
        ImageFormat::Bmp => ImageOutputFormat::Bmp,
        _ => ImageOutputFormat::Png,
    };

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, output)
        .map_err(|e| PdfToolError::ImageError(e.to_string()))?;

    tracing::debug!(width, height, ?format, "Resized image");
    Ok(ResizedImage {
        bytes: buffer.into_inner(),
        format,
    })
}
