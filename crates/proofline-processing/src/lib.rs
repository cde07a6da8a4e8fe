//! Proofline Processing Library
//!
//! Upload validation and the image transformation stage that turns an original
//! into a watermarked proof and a thumbnail. Everything here is synchronous and
//! CPU-bound; async callers run it on the blocking pool.

pub mod compression;
pub mod image;
pub mod validator;

pub use compression::JpegEncoder;
pub use image::{ImageTransformer, TransformOptions, TransformOutput};
pub use validator::{MediaValidator, ValidationError};
