use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proofline_core::{FinalizeOutcome, NewPhotoRecord, PhotoStore, ProcessedPhotoRecord};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

const PHOTO_COLUMNS: &str = "id, classroom_id, original_path, watermarked_url, thumbnail_url, \
     width, height, file_size_bytes, mime_type, alt_text, created_at";

#[derive(FromRow)]
struct PhotoRow {
    id: Uuid,
    classroom_id: Uuid,
    original_path: String,
    watermarked_url: String,
    thumbnail_url: String,
    width: i32,
    height: i32,
    file_size_bytes: i64,
    mime_type: String,
    alt_text: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    photo: PhotoRow,
    inserted: bool,
}

impl From<PhotoRow> for ProcessedPhotoRecord {
    fn from(row: PhotoRow) -> Self {
        ProcessedPhotoRecord {
            id: row.id,
            classroom_id: row.classroom_id,
            original_path: row.original_path,
            watermarked_url: row.watermarked_url,
            thumbnail_url: row.thumbnail_url,
            width: row.width.max(0) as u32,
            height: row.height.max(0) as u32,
            file_size_bytes: row.file_size_bytes.max(0) as u64,
            mime_type: row.mime_type,
            alt_text: row.alt_text,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PostgresPhotoRepository {
    pool: PgPool,
}

impl PostgresPhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoStore for PostgresPhotoRepository {
    /// Single-statement upsert; `xmax = 0` only holds for a freshly inserted row.
    #[tracing::instrument(skip(self, record), fields(photo_id = %record.id))]
    async fn upsert(&self, record: NewPhotoRecord) -> Result<FinalizeOutcome> {
        let sql = format!(
            r#"
            INSERT INTO processed_photos (
                id, classroom_id, original_path, watermarked_url, thumbnail_url,
                width, height, file_size_bytes, mime_type, alt_text
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                classroom_id = EXCLUDED.classroom_id,
                watermarked_url = EXCLUDED.watermarked_url,
                thumbnail_url = EXCLUDED.thumbnail_url,
                width = EXCLUDED.width,
                height = EXCLUDED.height,
                file_size_bytes = EXCLUDED.file_size_bytes,
                mime_type = EXCLUDED.mime_type,
                alt_text = EXCLUDED.alt_text,
                updated_at = NOW()
            RETURNING {}, (xmax = 0) AS inserted
            "#,
            PHOTO_COLUMNS
        );

        let row: UpsertRow = sqlx::query_as::<Postgres, UpsertRow>(&sql)
            .bind(record.id)
            .bind(record.classroom_id)
            .bind(&record.original_path)
            .bind(&record.watermarked_url)
            .bind(&record.thumbnail_url)
            .bind(i32::try_from(record.width).context("width out of range")?)
            .bind(i32::try_from(record.height).context("height out of range")?)
            .bind(i64::try_from(record.file_size_bytes).context("file size out of range")?)
            .bind(&record.mime_type)
            .bind(&record.alt_text)
            .fetch_one(&self.pool)
            .await
            .context("Failed to upsert processed photo")?;

        Ok(FinalizeOutcome {
            record: row.photo.into(),
            created: row.inserted,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<ProcessedPhotoRecord>> {
        let sql = format!("SELECT {} FROM processed_photos WHERE id = $1", PHOTO_COLUMNS);
        let row: Option<PhotoRow> = sqlx::query_as::<Postgres, PhotoRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load processed photo")?;
        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_classroom(&self, classroom_id: Uuid) -> Result<Vec<ProcessedPhotoRecord>> {
        let sql = format!(
            "SELECT {} FROM processed_photos WHERE classroom_id = $1 \
             ORDER BY created_at DESC, id",
            PHOTO_COLUMNS
        );
        let rows: Vec<PhotoRow> = sqlx::query_as::<Postgres, PhotoRow>(&sql)
            .bind(classroom_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list classroom photos")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
