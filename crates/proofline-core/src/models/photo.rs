use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deterministic photo ids (UUIDv5 over the original path)
pub const PHOTO_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a9e_4b7d_5e38_9a0f_3c2d_1b4e_7a65);

/// Deterministic record id for the job that processes `original_path`.
///
/// Redelivered jobs map to the same id, so finalization is an upsert and derived
/// blobs land on the same paths.
pub fn photo_id_for(original_path: &str) -> Uuid {
    Uuid::new_v5(&PHOTO_ID_NAMESPACE, original_path.as_bytes())
}

/// Persisted, buyer-visible photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPhotoRecord {
    pub id: Uuid,
    pub classroom_id: Uuid,
    pub original_path: String,
    pub watermarked_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Record contents supplied by the finalizer; `created_at` is owned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhotoRecord {
    pub id: Uuid,
    pub classroom_id: Uuid,
    pub original_path: String,
    pub watermarked_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub alt_text: Option<String>,
}

impl NewPhotoRecord {
    pub fn into_record(self, created_at: DateTime<Utc>) -> ProcessedPhotoRecord {
        ProcessedPhotoRecord {
            id: self.id,
            classroom_id: self.classroom_id,
            original_path: self.original_path,
            watermarked_url: self.watermarked_url,
            thumbnail_url: self.thumbnail_url,
            width: self.width,
            height: self.height,
            file_size_bytes: self.file_size_bytes,
            mime_type: self.mime_type,
            alt_text: self.alt_text,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_id_is_deterministic_per_original() {
        let a = photo_id_for("originals/c1/one.jpg");
        assert_eq!(a, photo_id_for("originals/c1/one.jpg"));
        assert_ne!(a, photo_id_for("originals/c1/two.jpg"));
    }
}
