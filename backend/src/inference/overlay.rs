use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use ndarray::Array2;

use crate::inference::error::PredictError;

/// Jet-style colormap over [0, 1]: dark blue through cyan, green and
/// yellow to dark red.
pub fn jet(v: f32) -> [u8; 3] {
    let v = v.clamp(0.0, 1.0) * 4.0;
    let r = (1.5 - (v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (v - 1.0).abs()).clamp(0.0, 1.0);
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

/// Renders the relevance map as a colorized heatmap blended over the
/// original image. The map is upsampled with Lanczos resampling to the
/// image's resolution, so the output always matches the input dimensions.
pub fn render(map: &Array2<f32>, original: &DynamicImage, alpha: f32) -> RgbImage {
    let (rows, cols) = map.dim();
    let mut gray = GrayImage::new(cols as u32, rows as u32);
    for ((y, x), &v) in map.indexed_iter() {
        let scaled = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        gray.put_pixel(x as u32, y as u32, Luma([scaled]));
    }

    let base = original.to_rgb8();
    let (width, height) = base.dimensions();
    let upsampled = image::imageops::resize(&gray, width, height, FilterType::Lanczos3);

    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let heat = jet(upsampled.get_pixel(x, y)[0] as f32 / 255.0);
        let src = base.get_pixel(x, y);
        let mut blended = [0u8; 3];
        for c in 0..3 {
            let v = src[c] as f32 * (1.0 - alpha) + heat[c] as f32 * alpha;
            blended[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgb(blended);
    }
    out
}

/// Encodes the rendered overlay as a base64 PNG for the JSON response.
pub fn encode_png_base64(image: &RgbImage) -> Result<String, PredictError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| PredictError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(&buf))
}

/// Raw numeric variant of the explanation: the relevance map scaled to
/// 0-255, row by row.
pub fn heatmap_grid(map: &Array2<f32>) -> Vec<Vec<u8>> {
    map.outer_iter()
        .map(|row| {
            row.iter()
                .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
                .collect()
        })
        .collect()
}
