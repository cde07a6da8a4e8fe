use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use std::io::Cursor;

use crate::image::resize::ImageResize;

/// Tiled watermark settings
#[derive(Debug, Clone, Copy)]
pub struct WatermarkConfig {
    /// Multiplier applied to the overlay's alpha channel, `0.0..=1.0`
    pub opacity: f32,
    /// Tile width as a fraction of the image width
    pub tile_scale: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            opacity: 0.35,
            tile_scale: 0.25,
        }
    }
}

/// A decoded overlay asset ready to be tiled
pub struct TiledWatermark {
    overlay: RgbaImage,
}

impl TiledWatermark {
    /// Decode the overlay asset.
    pub fn decode(asset: &[u8]) -> anyhow::Result<Self> {
        let reader = image::ImageReader::new(Cursor::new(asset)).with_guessed_format()?;
        let overlay = reader.decode()?.to_rgba8();
        if overlay.width() == 0 || overlay.height() == 0 {
            anyhow::bail!("watermark asset has zero dimensions");
        }
        Ok(Self { overlay })
    }

    /// Repeat the translucent overlay across the whole image.
    pub fn apply(&self, img: DynamicImage, config: &WatermarkConfig) -> DynamicImage {
        let (img_width, img_height) = img.dimensions();
        let (wm_width, wm_height) = self.overlay.dimensions();

        let tile_width = ((img_width as f32 * config.tile_scale).round() as u32).clamp(1, img_width);
        let tile_height =
            ((wm_height as u64 * tile_width as u64 + wm_width as u64 / 2) / wm_width as u64).max(1)
                as u32;

        let mut tile = if (tile_width, tile_height) == (wm_width, wm_height) {
            self.overlay.clone()
        } else {
            let filter = ImageResize::select_filter(wm_width, wm_height, tile_width, tile_height);
            imageops::resize(&self.overlay, tile_width, tile_height, filter)
        };

        let opacity = config.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in tile.pixels_mut() {
                pixel[3] = (pixel[3] as f32 * opacity) as u8;
            }
        }

        let mut img_rgba = img.to_rgba8();
        let mut y = 0;
        while y < img_height {
            let mut x = 0;
            while x < img_width {
                imageops::overlay(&mut img_rgba, &tile, x as i64, y as i64);
                x += tile_width;
            }
            y += tile_height;
        }

        DynamicImage::ImageRgba8(img_rgba)
    }
}
