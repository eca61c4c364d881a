use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::detect::{InputLayout, ModelShape};

use super::ImageFrame;

/// Input normalization: `(value - mean) / std`.
const INPUT_MEAN: f32 = 0.0;
const INPUT_STD: f32 = 255.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb24 => 3,
        }
    }
}

/// Resize a frame to the model input and lay it out as normalized `f32`.
///
/// Resizing is nearest-neighbour. Output is `[1, 3, H, W]` planar or
/// `[1, H, W, 3]` interleaved depending on the model's input layout.
pub fn prepare_input(frame: &ImageFrame, shape: &ModelShape) -> Result<Vec<f32>> {
    if shape.tensor_width == 0 || shape.tensor_height == 0 {
        return Err(anyhow!("model input size is not initialized"));
    }
    let rgb = to_rgb_image(frame)?;
    let (width, height) = (shape.tensor_width as u32, shape.tensor_height as u32);
    let resized = if rgb.dimensions() == (width, height) {
        rgb
    } else {
        imageops::resize(&rgb, width, height, FilterType::Nearest)
    };

    let plane = shape.tensor_width * shape.tensor_height;
    let mut input = vec![0.0f32; plane * 3];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * shape.tensor_width + x as usize;
        for channel in 0..3 {
            let value = (pixel[channel] as f32 - INPUT_MEAN) / INPUT_STD;
            let idx = match shape.layout {
                InputLayout::Nchw => channel * plane + offset,
                InputLayout::Nhwc => offset * 3 + channel,
            };
            input[idx] = value;
        }
    }
    Ok(input)
}

fn to_rgb_image(frame: &ImageFrame) -> Result<RgbImage> {
    let expected = (frame.width as usize)
        .checked_mul(frame.height as usize)
        .and_then(|v| v.checked_mul(frame.format.bytes_per_pixel()))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    if frame.pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            frame.format,
            expected,
            frame.pixels.len()
        ));
    }

    match frame.format {
        PixelFormat::Rgb24 => RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
            .ok_or_else(|| anyhow!("RGB buffer does not match frame size")),
        PixelFormat::Rgba8 => {
            let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
                .ok_or_else(|| anyhow!("RGBA buffer does not match frame size"))?;
            Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
        }
    }
}
