use image::{DynamicImage, GenericImageView};

use crate::image::resize::ImageResize;

pub struct Thumbnail;

impl Thumbnail {
    /// Square, center-cropped thumbnail of `size`×`size`.
    pub fn square(img: &DynamicImage, size: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let filter = ImageResize::select_filter(width, height, size, size);
        img.resize_to_fill(size, size, filter)
    }
}
