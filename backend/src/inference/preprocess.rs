use image::DynamicImage;
use image::imageops::FilterType;
use tch::{Kind, Tensor};

use crate::inference::error::PredictError;

/// Decodes an uploaded payload into an image, failing on anything that is
/// not a recognizable raster format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PredictError> {
    let image = image::load_from_memory(bytes)?;
    Ok(image)
}

/// Turns a decoded image into the `[1, 3, size, size]` float tensor the
/// network expects: RGB conversion, bilinear resize, channel-first layout
/// and Xception-style scaling of pixel values into [-1, 1].
pub fn preprocess(image: &DynamicImage, size: u32) -> Tensor {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);
    let raw = resized.into_raw();
    Tensor::from_slice(&raw)
        .to_kind(Kind::Float)
        .view([size as i64, size as i64, 3])
        .permute([2, 0, 1])
        .unsqueeze(0)
        / 127.5
        - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        let result = decode_image(&[0u8, 1, 2, 3, 4, 5, 6, 7]);
        assert!(matches!(result, Err(PredictError::ImageDecode(_))));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        // PNG magic followed by nothing.
        let result = decode_image(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        assert!(result.is_err());
    }

    #[test]
    fn preprocess_produces_expected_shape() {
        let tensor = preprocess(&gradient_image(640, 480), 224);
        assert_eq!(tensor.size(), [1, 3, 224, 224]);
        assert_eq!(tensor.kind(), Kind::Float);
    }

    #[test]
    fn preprocess_scales_into_unit_interval() {
        let tensor = preprocess(&gradient_image(64, 64), 224);
        let min = tensor.min().double_value(&[]);
        let max = tensor.max().double_value(&[]);
        assert!(min >= -1.0 - 1e-6);
        assert!(max <= 1.0 + 1e-6);
    }

    #[test]
    fn preprocess_is_deterministic() {
        let image = gradient_image(300, 200);
        let a = preprocess(&image, 224);
        let b = preprocess(&image, 224);
        assert_eq!(
            Vec::<f32>::try_from(a.view([-1])).unwrap(),
            Vec::<f32>::try_from(b.view([-1])).unwrap()
        );
    }
}
