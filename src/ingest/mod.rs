//! Camera frames entering the pipeline.
//!
//! Capture itself happens outside this crate. Frames arrive as RGBA or RGB
//! buffers and are resized and normalized for the detector here. Still
//! images can be loaded from disk for replays and demos.

pub mod normalize;

use std::path::Path;

use anyhow::{Context, Result};

pub use normalize::{prepare_input, PixelFormat};

/// One captured color frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl ImageFrame {
    pub fn rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels,
        }
    }

    pub fn rgb(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgb24,
            pixels,
        }
    }

    /// Decode a JPEG or PNG still into an RGBA frame.
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::rgba(width, height, img.into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_is_an_error() {
        assert!(ImageFrame::open(Path::new("/nonexistent/frame.png")).is_err());
    }
}
