//! Shared key generation for storage backends.

use uuid::Uuid;

use crate::{StorageError, StorageResult};

/// File extension for an allowed content type
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Collision-resistant path for an uploaded original.
pub fn original_key(classroom_id: Uuid, upload_id: Uuid, extension: &str) -> String {
    format!(
        "originals/{}/{}.{}",
        classroom_id,
        upload_id,
        extension.trim_start_matches('.').to_lowercase()
    )
}

/// Deterministic path of the watermarked rendition of a photo.
pub fn watermarked_key(classroom_id: Uuid, photo_id: Uuid) -> String {
    format!("processed/{}/{}.jpg", classroom_id, photo_id)
}

/// Deterministic path of the thumbnail of a photo.
pub fn thumbnail_key(classroom_id: Uuid, photo_id: Uuid) -> String {
    format!("thumbnails/{}/{}.jpg", classroom_id, photo_id)
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// `{base}/{key}` with each key segment percent-encoded.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}
