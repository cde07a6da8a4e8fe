use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Target size when capping width at `max_width`, preserving aspect ratio.
    ///
    /// Height is `round(h * max / w)` in integer arithmetic, never below 1.
    /// Images already within the cap keep their size.
    pub fn fit_width(orig_width: u32, orig_height: u32, max_width: u32) -> (u32, u32) {
        if orig_width <= max_width || orig_width == 0 {
            return (orig_width, orig_height);
        }
        let w = orig_width as u64;
        let scaled = (orig_height as u64 * max_width as u64 + w / 2) / w;
        (max_width, (scaled as u32).max(1))
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Downscale to `max_width` if wider; never upscales.
    pub fn limit_width(img: DynamicImage, max_width: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::fit_width(orig_width, orig_height, max_width);
        if (width, height) == (orig_width, orig_height) {
            return img;
        }

        tracing::debug!(
            from_width = orig_width,
            from_height = orig_height,
            to_width = width,
            to_height = height,
            "Resizing image"
        );
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}
