use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use ndarray::Array4;

use super::model::InferenceError;

/// One upload, decoded to 8-bit RGB.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub pixels: RgbImage,
}

impl UploadedImage {
    /// Accepts JPEG and PNG only, whatever the file name claims.
    pub fn decode(file_name: Option<String>, bytes: Vec<u8>) -> Result<Self, InferenceError> {
        if let Some(name) = file_name.as_deref() {
            if !shared::has_accepted_extension(name) {
                return Err(InferenceError::UnsupportedExtension(name.to_string()));
            }
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| InferenceError::ImageDecode(e.to_string()))?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(InferenceError::ImageDecode(format!(
                "{:?} images are not supported",
                format
            )));
        }

        let pixels = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| InferenceError::ImageDecode(e.to_string()))?
            .to_rgb8();

        Ok(Self {
            file_name,
            bytes,
            pixels,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// `name (WxH, N bytes)` for log lines.
    pub fn summary(&self) -> String {
        let (width, height) = self.dimensions();
        format!(
            "{} ({}x{}, {} bytes)",
            self.file_name.as_deref().unwrap_or("<unnamed>"),
            width,
            height,
            self.bytes.len()
        )
    }
}

/// Direct resize to `size`×`size`, scaled to [0, 1], with a batch axis of 1.
///
/// Layout is NHWC: `[1, size, size, 3]`.
pub fn preprocess(pixels: &RgbImage, size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(pixels, size, size, FilterType::CatmullRom);
    let side = size as usize;

    let mut input = Array4::<f32>::zeros((1, side, side, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for (channel, value) in pixel.0.iter().enumerate() {
            input[[0, y as usize, x as usize, channel]] = *value as f32 / 255.0;
        }
    }
    input
}
