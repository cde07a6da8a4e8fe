//! Image transformer - turns an original into a proof rendition and thumbnail
//!
//! The stage is a pure function of the original bytes, the optional overlay asset
//! and [`TransformOptions`]. It performs no I/O and has no retry of its own.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView};
use proofline_core::{ImageConfig, PipelineError, PipelineResult, WatermarkPolicy};
use std::io::Cursor;

use crate::compression::{JpegEncoder, JPEG_MIME_TYPE};
use crate::image::resize::ImageResize;
use crate::image::thumbnail::Thumbnail;
use crate::image::watermark::{TiledWatermark, WatermarkConfig};

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub max_width: u32,
    pub thumbnail_size: u32,
    pub jpeg_quality: u8,
    pub watermark: WatermarkConfig,
    pub policy: WatermarkPolicy,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_width: 1500,
            thumbnail_size: 300,
            jpeg_quality: 82,
            watermark: WatermarkConfig::default(),
            policy: WatermarkPolicy::Strict,
        }
    }
}

impl From<&ImageConfig> for TransformOptions {
    fn from(config: &ImageConfig) -> Self {
        Self {
            max_width: config.max_width,
            thumbnail_size: config.thumbnail_size,
            jpeg_quality: config.jpeg_quality,
            watermark: WatermarkConfig {
                opacity: config.watermark_opacity,
                tile_scale: config.watermark_tile_scale,
            },
            policy: config.watermark_policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub processed: Bytes,
    pub thumbnail: Bytes,
    pub width: u32,
    pub height: u32,
    /// Size of `processed` in bytes
    pub byte_size: u64,
    pub mime_type: &'static str,
    /// `false` only when the fallback policy skipped protection
    pub watermarked: bool,
}

pub struct ImageTransformer;

impl ImageTransformer {
    /// Decode, read intrinsic dimensions and reject empty images.
    pub fn decode(data: &[u8]) -> PipelineResult<DynamicImage> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(PipelineError::Decode("unrecognized image format".into()));
        }
        let img = reader
            .decode()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::Decode("image has zero dimensions".into()));
        }
        Ok(img)
    }

    /// Run the full stage.
    ///
    /// `watermark_asset` is `None` when the overlay could not be loaded; what
    /// happens then is decided by `options.policy`.
    pub fn transform(
        original: &[u8],
        watermark_asset: Option<&[u8]>,
        options: &TransformOptions,
    ) -> PipelineResult<TransformOutput> {
        let img = Self::decode(original)?;
        let (orig_width, orig_height) = img.dimensions();

        let img = ImageResize::limit_width(img, options.max_width);
        let (width, height) = img.dimensions();

        let overlay = match watermark_asset.map(TiledWatermark::decode) {
            Some(Ok(overlay)) => Some(overlay),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Watermark asset could not be decoded");
                None
            }
            None => None,
        };

        let (img, watermarked) = match (overlay, options.policy) {
            (Some(overlay), _) => (overlay.apply(img, &options.watermark), true),
            (None, WatermarkPolicy::Strict) => {
                return Err(PipelineError::WatermarkMissing(
                    "overlay asset unavailable and policy is strict".into(),
                ));
            }
            (None, WatermarkPolicy::FallbackPlain) => {
                tracing::warn!(
                    width,
                    height,
                    "Watermark asset unavailable, publishing unprotected proof"
                );
                (img, false)
            }
        };

        let thumbnail = Thumbnail::square(&img, options.thumbnail_size);

        let processed = JpegEncoder::encode(&img, options.jpeg_quality).map_err(encode_failure)?;
        let thumbnail =
            JpegEncoder::encode(&thumbnail, options.jpeg_quality).map_err(encode_failure)?;

        tracing::debug!(
            orig_width,
            orig_height,
            width,
            height,
            processed_bytes = processed.len(),
            thumbnail_bytes = thumbnail.len(),
            watermarked,
            "Image transformed"
        );

        Ok(TransformOutput {
            byte_size: processed.len() as u64,
            processed,
            thumbnail,
            width,
            height,
            mime_type: JPEG_MIME_TYPE,
            watermarked,
        })
    }
}

fn encode_failure(err: anyhow::Error) -> PipelineError {
    PipelineError::Encode(format!("JPEG encoding failed: {:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn photo(width: u32, height: u32) -> Vec<u8> {
        encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 200, 220]))),
            ImageFormat::Jpeg,
        )
    }

    fn overlay() -> Vec<u8> {
        encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 200]))),
            ImageFormat::Png,
        )
    }

    #[test]
    fn test_resizes_and_watermarks() {
        let output =
            ImageTransformer::transform(&photo(4000, 3000), Some(&overlay()), &Default::default())
                .unwrap();

        assert_eq!((output.width, output.height), (1500, 1125));
        assert!(output.watermarked);
        assert_eq!(output.mime_type, "image/jpeg");
        assert_eq!(output.byte_size, output.processed.len() as u64);

        let processed = image::load_from_memory(&output.processed).unwrap();
        assert_eq!(processed.dimensions(), (1500, 1125));
        let thumbnail = image::load_from_memory(&output.thumbnail).unwrap();
        assert_eq!(thumbnail.dimensions(), (300, 300));
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let output =
            ImageTransformer::transform(&photo(640, 480), Some(&overlay()), &Default::default())
                .unwrap();
        assert_eq!((output.width, output.height), (640, 480));
    }

    #[test]
    fn test_strict_policy_fails_without_asset() {
        let err = ImageTransformer::transform(&photo(100, 100), None, &Default::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::WatermarkMissing(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fallback_policy_publishes_plain() {
        let options = TransformOptions {
            policy: WatermarkPolicy::FallbackPlain,
            ..Default::default()
        };
        let output = ImageTransformer::transform(&photo(100, 80), None, &options).unwrap();
        assert!(!output.watermarked);
        assert_eq!((output.width, output.height), (100, 80));
    }

    #[test]
    fn test_corrupt_asset_follows_policy() {
        let err = ImageTransformer::transform(
            &photo(100, 100),
            Some(b"garbage".as_slice()),
            &Default::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::WatermarkMissing(_)));
    }

    #[test]
    fn test_corrupt_original_is_decode_error() {
        let err = ImageTransformer::transform(b"\xFF\xD8\xFF\xE0 truncated", Some(&overlay()), &Default::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));

        let err = ImageTransformer::transform(b"plain text", Some(&overlay()), &Default::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_encoder_failure_is_not_reported_as_decode() {
        let err = encode_failure(anyhow::anyhow!("scanline write failed"));
        assert!(matches!(err, PipelineError::Encode(_)));
        assert_eq!(err.error_code(), "ENCODE_ERROR");
        assert!(err.to_string().contains("scanline write failed"));
    }
}
