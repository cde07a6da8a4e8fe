//! Configuration module
//!
//! Environment-driven configuration split into typed sections. `.env` is loaded
//! first when present. Parsing goes through [`Config::from_lookup`] so tests can
//! supply variables without touching the process environment.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::models::WatermarkPolicy;
use crate::retry::RetryPolicy;
use crate::storage_types::{PersistenceBackend, StorageBackend};

const SERVER_PORT: u16 = 3000;
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECONDS: u64 = 30;
const QUEUE_NAME: &str = "photo_processing";
const LOCAL_STORAGE_PATH: &str = "./data/media";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:3000/media";
const MAX_UPLOAD_SIZE_BYTES: usize = 50 * 1024 * 1024;
const ALLOWED_CONTENT_TYPES: &str = "image/jpeg,image/png,image/webp";
const UPLOAD_CONCURRENCY: usize = 3;
const UPLOAD_MAX_ATTEMPTS: u32 = 3;
const UPLOAD_RETRY_BASE_DELAY_MS: u64 = 500;
const WORKER_BATCH_SIZE: usize = 10;
const WORKER_VISIBILITY_SECONDS: u64 = 300;
const WORKER_CONCURRENCY: usize = 50;
const WORKER_MAX_DELIVERIES: i32 = 5;
const WORKER_POLL_INTERVAL_SECS: u64 = 30;
const IMAGE_MAX_WIDTH: u32 = 1500;
const THUMBNAIL_SIZE: u32 = 300;
const JPEG_QUALITY: u8 = 82;
/// Proof renditions stay within this quality band
const JPEG_QUALITY_RANGE: std::ops::RangeInclusive<u8> = 80..=85;
const WATERMARK_ASSET_PATH: &str = "watermarks/proof.png";
const WATERMARK_OPACITY: f32 = 0.35;
const WATERMARK_TILE_SCALE: f32 = 0.25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub timeout_seconds: u64,
    pub queue_backend: PersistenceBackend,
    pub photo_store_backend: PersistenceBackend,
    pub queue_name: String,
}

impl DatabaseConfig {
    pub fn needs_postgres(&self) -> bool {
        self.queue_backend == PersistenceBackend::Postgres
            || self.photo_store_backend == PersistenceBackend::Postgres
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
    pub local_base_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, Spaces)
    pub s3_endpoint: Option<String>,
    pub s3_public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl UploadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_attempts, self.retry_base_delay)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub batch_size: usize,
    pub visibility: Duration,
    pub concurrency: usize,
    pub max_deliveries: i32,
    pub poll_interval: Duration,
    pub secret: Option<String>,
    pub wake_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub max_width: u32,
    pub thumbnail_size: u32,
    pub jpeg_quality: u8,
    pub watermark_asset_path: String,
    pub watermark_policy: WatermarkPolicy,
    pub watermark_opacity: f32,
    pub watermark_tile_scale: f32,
}

#[derive(Debug, Clone, Default)]
pub struct HooksConfig {
    pub cache_revalidate_url: Option<String>,
    pub cache_revalidate_secret: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub worker: WorkerConfig,
    pub image: ImageConfig,
    pub hooks: HooksConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let server = ServerConfig {
            port: env.parse("SERVER_PORT", SERVER_PORT)?,
            environment: env.string("ENVIRONMENT", "development"),
            log_format: env.parse("LOG_FORMAT", LogFormat::Text)?,
        };

        let database = DatabaseConfig {
            url: env.optional("DATABASE_URL"),
            max_connections: env.parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS)?,
            timeout_seconds: env.parse("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECONDS)?,
            queue_backend: env.parse("QUEUE_BACKEND", PersistenceBackend::Postgres)?,
            photo_store_backend: env.parse("PHOTO_STORE_BACKEND", PersistenceBackend::Postgres)?,
            queue_name: env.string("QUEUE_NAME", QUEUE_NAME),
        };

        let storage = StorageConfig {
            backend: env.parse("STORAGE_BACKEND", StorageBackend::Local)?,
            local_path: env.string("LOCAL_STORAGE_PATH", LOCAL_STORAGE_PATH),
            local_base_url: env.string("LOCAL_STORAGE_BASE_URL", LOCAL_STORAGE_BASE_URL),
            s3_bucket: env.optional("S3_BUCKET"),
            s3_region: env.optional("S3_REGION").or_else(|| env.optional("AWS_REGION")),
            s3_endpoint: env.optional("S3_ENDPOINT"),
            s3_public_base_url: env.optional("S3_PUBLIC_BASE_URL"),
        };

        let upload = UploadConfig {
            max_size_bytes: env.parse("MAX_UPLOAD_SIZE_BYTES", MAX_UPLOAD_SIZE_BYTES)?,
            allowed_content_types: env
                .string("ALLOWED_CONTENT_TYPES", ALLOWED_CONTENT_TYPES)
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            concurrency: env.parse("UPLOAD_CONCURRENCY", UPLOAD_CONCURRENCY)?,
            max_attempts: env.parse("UPLOAD_MAX_ATTEMPTS", UPLOAD_MAX_ATTEMPTS)?,
            retry_base_delay: Duration::from_millis(
                env.parse("UPLOAD_RETRY_BASE_DELAY_MS", UPLOAD_RETRY_BASE_DELAY_MS)?,
            ),
        };

        let worker = WorkerConfig {
            batch_size: env.parse("WORKER_BATCH_SIZE", WORKER_BATCH_SIZE)?,
            visibility: Duration::from_secs(
                env.parse("WORKER_VISIBILITY_SECONDS", WORKER_VISIBILITY_SECONDS)?,
            ),
            concurrency: env.parse("WORKER_CONCURRENCY", WORKER_CONCURRENCY)?,
            max_deliveries: env.parse("WORKER_MAX_DELIVERIES", WORKER_MAX_DELIVERIES)?,
            poll_interval: Duration::from_secs(
                env.parse("WORKER_POLL_INTERVAL_SECS", WORKER_POLL_INTERVAL_SECS)?,
            ),
            secret: env.optional("WORKER_SECRET"),
            wake_url: env.optional("WORKER_WAKE_URL"),
        };

        let image = ImageConfig {
            max_width: env.parse("IMAGE_MAX_WIDTH", IMAGE_MAX_WIDTH)?,
            thumbnail_size: env.parse("THUMBNAIL_SIZE", THUMBNAIL_SIZE)?,
            jpeg_quality: env.parse("JPEG_QUALITY", JPEG_QUALITY)?,
            watermark_asset_path: env.string("WATERMARK_ASSET_PATH", WATERMARK_ASSET_PATH),
            watermark_policy: env.parse("WATERMARK_POLICY", WatermarkPolicy::Strict)?,
            watermark_opacity: env.parse("WATERMARK_OPACITY", WATERMARK_OPACITY)?,
            watermark_tile_scale: env.parse("WATERMARK_TILE_SCALE", WATERMARK_TILE_SCALE)?,
        };

        let hooks = HooksConfig {
            cache_revalidate_url: env.optional("CACHE_REVALIDATE_URL"),
            cache_revalidate_secret: env.optional("CACHE_REVALIDATE_SECRET"),
        };

        Ok(Config {
            server,
            database,
            storage,
            upload,
            worker,
            image,
            hooks,
        })
    }

    /// Build from a fixed set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.server.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.needs_postgres() && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        if let Some(url) = &self.database.url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ConfigError::Invalid {
                    key: "DATABASE_URL",
                    value: "<redacted>".to_string(),
                });
            }
        }

        if self.storage.backend == StorageBackend::S3 {
            if self.storage.s3_bucket.is_none() {
                return Err(ConfigError::Missing("S3_BUCKET"));
            }
            if self.storage.s3_region.is_none() && self.storage.s3_endpoint.is_none() {
                return Err(ConfigError::Missing("S3_REGION"));
            }
        }

        if self.upload.max_size_bytes == 0 {
            return Err(ConfigError::Inconsistent(
                "MAX_UPLOAD_SIZE_BYTES must be greater than zero".into(),
            ));
        }
        if self.upload.allowed_content_types.is_empty() {
            return Err(ConfigError::Missing("ALLOWED_CONTENT_TYPES"));
        }
        if self.upload.concurrency == 0 || self.worker.concurrency == 0 {
            return Err(ConfigError::Inconsistent(
                "UPLOAD_CONCURRENCY and WORKER_CONCURRENCY must be at least 1".into(),
            ));
        }
        if self.upload.max_attempts == 0 {
            return Err(ConfigError::Inconsistent(
                "UPLOAD_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }
        if self.worker.batch_size == 0 || self.worker.visibility.is_zero() {
            return Err(ConfigError::Inconsistent(
                "WORKER_BATCH_SIZE and WORKER_VISIBILITY_SECONDS must be positive".into(),
            ));
        }
        if self.worker.max_deliveries < 1 {
            return Err(ConfigError::Inconsistent(
                "WORKER_MAX_DELIVERIES must be at least 1".into(),
            ));
        }
        if self.worker.poll_interval.is_zero() {
            return Err(ConfigError::Inconsistent(
                "WORKER_POLL_INTERVAL_SECS must be positive".into(),
            ));
        }

        if self.image.max_width == 0 || self.image.thumbnail_size == 0 {
            return Err(ConfigError::Inconsistent(
                "IMAGE_MAX_WIDTH and THUMBNAIL_SIZE must be positive".into(),
            ));
        }
        if !JPEG_QUALITY_RANGE.contains(&self.image.jpeg_quality) {
            return Err(ConfigError::Invalid {
                key: "JPEG_QUALITY",
                value: self.image.jpeg_quality.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.image.watermark_opacity) {
            return Err(ConfigError::Invalid {
                key: "WATERMARK_OPACITY",
                value: self.image.watermark_opacity.to_string(),
            });
        }
        if !(self.image.watermark_tile_scale > 0.0 && self.image.watermark_tile_scale <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "WATERMARK_TILE_SCALE",
                value: self.image.watermark_tile_scale.to_string(),
            });
        }

        if self.is_production() && self.worker.secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("WORKER_SECRET"));
        }

        Ok(())
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { key, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_map(&vars)
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.queue_name, "photo_processing");
        assert_eq!(config.upload.max_size_bytes, 52_428_800);
        assert_eq!(config.upload.concurrency, 3);
        assert_eq!(config.upload.max_attempts, 3);
        assert_eq!(config.upload.retry_base_delay, Duration::from_millis(500));
        assert_eq!(config.worker.batch_size, 10);
        assert_eq!(config.worker.visibility, Duration::from_secs(300));
        assert_eq!(config.worker.concurrency, 50);
        assert_eq!(config.worker.max_deliveries, 5);
        assert_eq!(config.image.max_width, 1500);
        assert_eq!(config.image.thumbnail_size, 300);
        assert_eq!(config.image.jpeg_quality, 82);
        assert_eq!(config.image.watermark_policy, WatermarkPolicy::Strict);
        assert_eq!(
            config.upload.allowed_content_types,
            vec!["image/jpeg", "image/png", "image/webp"]
        );
    }

    #[test]
    fn postgres_backends_require_database_url() {
        let config = config_from(&[]).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::Missing("DATABASE_URL"))
        );

        let config = config_from(&[
            ("QUEUE_BACKEND", "memory"),
            ("PHOTO_STORE_BACKEND", "memory"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("WORKER_BATCH_SIZE", "ten")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "WORKER_BATCH_SIZE",
                value: "ten".into()
            }
        );
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let config = config_from(&[
            ("QUEUE_BACKEND", "memory"),
            ("PHOTO_STORE_BACKEND", "memory"),
            ("STORAGE_BACKEND", "s3"),
            ("S3_REGION", "eu-west-1"),
        ])
        .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::Missing("S3_BUCKET")));
    }

    #[test]
    fn production_requires_worker_secret() {
        let config = config_from(&[
            ("ENVIRONMENT", "production"),
            ("QUEUE_BACKEND", "memory"),
            ("PHOTO_STORE_BACKEND", "memory"),
        ])
        .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::Missing("WORKER_SECRET")));
    }

    #[test]
    fn watermark_policy_is_configurable() {
        let config = config_from(&[("WATERMARK_POLICY", "fallback_plain")]).unwrap();
        assert_eq!(config.image.watermark_policy, WatermarkPolicy::FallbackPlain);
    }

    #[test]
    fn jpeg_quality_must_stay_in_proof_band() {
        let memory = [("QUEUE_BACKEND", "memory"), ("PHOTO_STORE_BACKEND", "memory")];
        for quality in ["80", "85"] {
            let mut pairs = memory.to_vec();
            pairs.push(("JPEG_QUALITY", quality));
            assert!(config_from(&pairs).unwrap().validate().is_ok());
        }
        for quality in ["79", "86", "100"] {
            let mut pairs = memory.to_vec();
            pairs.push(("JPEG_QUALITY", quality));
            assert_eq!(
                config_from(&pairs).unwrap().validate(),
                Err(ConfigError::Invalid {
                    key: "JPEG_QUALITY",
                    value: quality.to_string()
                })
            );
        }
    }
}
