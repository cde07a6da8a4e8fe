//! JPEG encoding via mozjpeg

use anyhow::Result;
use bytes::Bytes;
use image::DynamicImage;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

pub struct JpegEncoder;

impl JpegEncoder {
    /// Encode as progressive JPEG with optimized Huffman tables.
    ///
    /// Alpha is dropped; callers composite onto an opaque image first.
    pub fn encode(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1, 100) as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }
}
