//! Image transcoding implementation

use image::{imageops::FilterType, DynamicImage, ImageEncoder};
use tokio::task;

use crate::errors::{DomainError, DomainResult};
use super::types::{OptimizeParams, OptimizedImage, OutputFormat};

/// Image transcoder using the `image` crate for resize and re-encode
#[derive(Debug, Clone, Default)]
pub struct ImageTranscoder;

impl ImageTranscoder {
    pub fn new() -> Self {
        Self
    }

    /// Resize the image to the parameter-derived dimensions, then encode it
    /// to the target format at the requested quality.
    pub async fn transcode(
        &self,
        data: Vec<u8>,
        params: OptimizeParams,
    ) -> DomainResult<OptimizedImage> {
        // Run image operations in a blocking task to avoid blocking the runtime
        task::spawn_blocking(move || transcode_blocking(data, params))
            .await
            .map_err(|e| DomainError::Internal(format!("Task join error: {}", e)))?
    }
}

fn transcode_blocking(data: Vec<u8>, params: OptimizeParams) -> DomainResult<OptimizedImage> {
    let img = image::load_from_memory(&data)
        .map_err(|e| DomainError::Decode(format!("Failed to load image: {}", e)))?;

    let (width, height) = params.output_dimensions();
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    let bytes = match params.format {
        OutputFormat::Jpg => encode_jpeg(&resized, params.quality),
        OutputFormat::Png => encode_png(&resized),
        OutputFormat::Webp => encode_webp(&resized, params.quality),
    }?;

    Ok(OptimizedImage {
        bytes,
        format: params.format,
        width,
        height,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> DomainResult<Vec<u8>> {
    let mut output = Vec::new();
    // JPEG has no alpha channel; flatten to RGB before encoding
    let rgb = img.to_rgb8();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| DomainError::Encode(format!("JPEG encoding error: {}", e)))?;
    Ok(output)
}

fn encode_png(img: &DynamicImage) -> DomainResult<Vec<u8>> {
    let mut output = Vec::new();
    let png = img.to_rgba8();
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut output,
        image::codecs::png::CompressionType::Best,
        image::codecs::png::FilterType::Adaptive,
    );
    encoder
        .write_image(&png, png.width(), png.height(), image::ColorType::Rgba8)
        .map_err(|e| DomainError::Encode(format!("PNG encoding error: {}", e)))?;
    Ok(output)
}

#[cfg(feature = "webp")]
fn encode_webp(img: &DynamicImage, quality: u8) -> DomainResult<Vec<u8>> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder.encode(quality as f32);
    Ok(encoded.to_vec())
}

#[cfg(not(feature = "webp"))]
fn encode_webp(img: &DynamicImage, _quality: u8) -> DomainResult<Vec<u8>> {
    // Without the webp feature, fall back to PNG
    encode_png(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_png_identity_roundtrip_keeps_dimensions() {
        let data = png_fixture(64, 48);
        let params = OptimizeParams {
            format: OutputFormat::Png,
            quality: 100,
            scale: 100,
            source_width: 64,
            source_height: 48,
        };

        let result = ImageTranscoder::new().transcode(data, params).await.unwrap();
        assert_eq!((result.width, result.height), (64, 48));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_half_scale_jpeg() {
        let data = png_fixture(800, 600);
        let params = OptimizeParams {
            format: OutputFormat::Jpg,
            quality: 80,
            scale: 50,
            source_width: 800,
            source_height: 600,
        };

        let result = ImageTranscoder::new().transcode(data, params).await.unwrap();
        assert_eq!((result.width, result.height), (400, 300));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (400, 300));
        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[cfg(feature = "webp")]
    fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([90, 120, 150]),
        ));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Jpeg(90),
        )
        .unwrap();
        bytes
    }

    #[cfg(feature = "webp")]
    #[tokio::test]
    async fn test_jpeg_to_half_scale_webp() {
        let data = jpeg_fixture(800, 600);
        let params = OptimizeParams {
            format: OutputFormat::Webp,
            quality: 80,
            scale: 50,
            source_width: 800,
            source_height: 600,
        };

        let result = ImageTranscoder::new().transcode(data, params).await.unwrap();
        assert_eq!((result.width, result.height), (400, 300));
        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            image::ImageFormat::WebP
        );
    }

    #[tokio::test]
    async fn test_alpha_input_survives_jpeg_encode() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            32,
            32,
            image::Rgba([200, 10, 10, 128]),
        ));
        let mut data = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut data),
            image::ImageOutputFormat::Png,
        )
        .unwrap();

        let params = OptimizeParams {
            format: OutputFormat::Jpg,
            quality: 90,
            scale: 100,
            source_width: 32,
            source_height: 32,
        };
        let result = ImageTranscoder::new().transcode(data, params).await.unwrap();
        assert!(!result.bytes.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_input_is_a_decode_error() {
        let params = OptimizeParams::default();
        let err = ImageTranscoder::new()
            .transcode(b"definitely not an image".to_vec(), params)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));
    }
}
