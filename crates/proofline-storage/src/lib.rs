//! Proofline Storage Library
//!
//! This crate provides the object store abstraction used for original and derived
//! photos, with implementations for the local filesystem, S3-compatible services
//! and memory.
//!
//! # Key layout
//!
//! All backends share the same layout, generated in the `keys` module:
//!
//! - **Originals**: `originals/{classroom_id}/{upload_id}.{ext}` (collision resistant,
//!   written with `overwrite = false`)
//! - **Watermarked**: `processed/{classroom_id}/{photo_id}.jpg`
//! - **Thumbnails**: `thumbnails/{classroom_id}/{photo_id}.jpg`
//!
//! Derived keys are deterministic per photo id, so a redelivered job overwrites its
//! own output instead of producing duplicates. Keys must not contain `..` or a
//! leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use proofline_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
