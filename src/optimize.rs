use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use serde::Deserialize;

use crate::error::AppError;

/// `?q=&w=&f=` parameters of the static media handler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeQuery {
    pub q: Option<u8>,
    pub w: Option<u32>,
    pub f: Option<String>,
}

impl OptimizeQuery {
    pub fn is_requested(&self) -> bool {
        self.q.is_some() || self.w.is_some() || self.f.is_some()
    }
}

pub struct Optimized {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Only these inputs go through the re-encoder; everything else (gifs,
/// videos) is served as-is.
pub fn is_optimizable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("jpg" | "jpeg" | "png" | "webp")
    )
}

/// Decodes, optionally downscales, and re-encodes one image. Runs on a
/// blocking thread; the caller falls back to the raw file on any error.
pub fn process(path: &Path, query: &OptimizeQuery) -> Result<Optimized, AppError> {
    let mut img = image::open(path).map_err(|err| AppError::BadRequest(err.to_string()))?;

    if let Some(width) = query.w {
        if width > 0 && width < img.width() {
            // Fit inside the requested width, never enlarging.
            img = img.resize(width, img.height(), FilterType::Lanczos3);
        }
    }

    let quality = query.q.unwrap_or(80).clamp(1, 100);
    let target = query
        .f
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default()
        });

    let mut bytes = Vec::new();
    let content_type = match target.as_str() {
        "jpg" | "jpeg" => {
            let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            "image/jpeg"
        }
        "webp" => {
            let encoder = WebPEncoder::new_lossless(Cursor::new(&mut bytes));
            img.to_rgba8()
                .write_with_encoder(encoder)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            "image/webp"
        }
        "png" => {
            img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            "image/png"
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "unsupported output format: {other}"
            )))
        }
    };

    Ok(Optimized {
        bytes,
        content_type,
    })
}
