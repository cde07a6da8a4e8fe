//! Image transformation stage
//!
//! decode → resize → watermark composite → thumbnail → re-encode

pub mod resize;
pub mod thumbnail;
pub mod transformer;
pub mod watermark;

pub use resize::ImageResize;
pub use thumbnail::Thumbnail;
pub use transformer::{ImageTransformer, TransformOptions, TransformOutput};
pub use watermark::{TiledWatermark, WatermarkConfig};
