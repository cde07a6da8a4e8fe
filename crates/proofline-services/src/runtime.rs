//! Process-wide service wiring
//!
//! [`Services::from_config`] builds every collaborator exactly once and hands out
//! shared handles. Nothing in the pipeline reaches for global state.

use std::sync::Arc;

use anyhow::{Context, Result};
use proofline_core::{
    CacheInvalidator, Config, NoOpCacheInvalidator, PersistenceBackend, PhotoStore, WakeTrigger,
    WorkQueue,
};
use proofline_db::{MemoryPhotoRepository, MemoryWorkQueue, PostgresPhotoRepository, PostgresWorkQueue};
use proofline_infra::{HttpCacheInvalidator, HttpWakeTrigger};
use proofline_processing::MediaValidator;
use proofline_storage::{create_storage, Storage};
use proofline_worker::{
    BatchRunner, ChannelWake, JobProducer, MetadataFinalizer, RunnerConfig, Scheduler,
};
use tokio::sync::mpsc;

use crate::upload::{UploadOrchestrator, UploadOrchestratorConfig};

pub struct Services {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<dyn WorkQueue>,
    pub photos: Arc<dyn PhotoStore>,
    pub validator: Arc<MediaValidator>,
    pub producer: JobProducer,
    pub runner: BatchRunner,
    pub uploads: Arc<UploadOrchestrator>,
    wake_rx: Option<mpsc::Receiver<()>>,
}

impl Services {
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let storage = create_storage(&config.storage)
            .await
            .context("Failed to initialize storage backend")?;

        let pool = if config.database.needs_postgres() {
            Some(proofline_db::connect(&config.database).await?)
        } else {
            None
        };

        let queue: Arc<dyn WorkQueue> = match (config.database.queue_backend, &pool) {
            (PersistenceBackend::Postgres, Some(pool)) => Arc::new(PostgresWorkQueue::new(
                pool.clone(),
                config.database.queue_name.clone(),
            )),
            _ => {
                tracing::warn!("Using in-memory work queue; jobs are lost on restart");
                Arc::new(MemoryWorkQueue::new(config.database.queue_name.clone()))
            }
        };

        let photos: Arc<dyn PhotoStore> = match (config.database.photo_store_backend, &pool) {
            (PersistenceBackend::Postgres, Some(pool)) => {
                Arc::new(PostgresPhotoRepository::new(pool.clone()))
            }
            _ => {
                tracing::warn!("Using in-memory photo store; records are lost on restart");
                Arc::new(MemoryPhotoRepository::new())
            }
        };

        let cache: Arc<dyn CacheInvalidator> = match &config.hooks.cache_revalidate_url {
            Some(url) => {
                tracing::info!(url = %url, "Storefront cache revalidation enabled");
                Arc::new(HttpCacheInvalidator::new(
                    url.clone(),
                    config.hooks.cache_revalidate_secret.clone(),
                )?)
            }
            None => Arc::new(NoOpCacheInvalidator),
        };

        let (wake, wake_rx): (Arc<dyn WakeTrigger>, Option<mpsc::Receiver<()>>) =
            match &config.worker.wake_url {
                Some(url) => {
                    tracing::info!(url = %url, "Remote worker wake enabled");
                    let wake: Arc<dyn WakeTrigger> = Arc::new(HttpWakeTrigger::new(
                        url.clone(),
                        config.worker.secret.clone(),
                    )?);
                    (wake, None)
                }
                None => {
                    let (wake, rx) = ChannelWake::channel();
                    let wake: Arc<dyn WakeTrigger> = Arc::new(wake);
                    (wake, Some(rx))
                }
            };

        let validator = Arc::new(MediaValidator::new(
            config.upload.max_size_bytes,
            config.upload.allowed_content_types.clone(),
        ));

        let producer = JobProducer::new(storage.clone(), queue.clone(), wake);
        let finalizer = Arc::new(MetadataFinalizer::new(photos.clone(), cache.clone()));
        let runner = BatchRunner::new(
            queue.clone(),
            storage.clone(),
            finalizer,
            RunnerConfig::from_config(&config.worker, &config.image),
        );
        let uploads = Arc::new(UploadOrchestrator::new(
            producer.clone(),
            validator.clone(),
            cache,
            UploadOrchestratorConfig::from(&config.upload),
        ));

        tracing::info!(
            storage = %storage.backend_type(),
            queue = %config.database.queue_backend,
            photo_store = %config.database.photo_store_backend,
            queue_name = %config.database.queue_name,
            watermark_policy = %config.image.watermark_policy,
            "Services initialized"
        );

        Ok(Self {
            config,
            storage,
            queue,
            photos,
            validator,
            producer,
            runner,
            uploads,
            wake_rx,
        })
    }

    /// Build the periodic scheduler. The in-process wake receiver, if any, moves
    /// into the first scheduler built.
    pub fn scheduler(&mut self) -> Scheduler {
        let scheduler = Scheduler::new(self.runner.clone(), self.config.worker.poll_interval);
        match self.wake_rx.take() {
            Some(rx) => scheduler.with_wake(rx),
            None => scheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proofline_core::UploadFile;
    use std::collections::HashMap;
    use std::io::Cursor;
    use uuid::Uuid;

    fn memory_config(extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = [
            ("STORAGE_BACKEND", "memory"),
            ("QUEUE_BACKEND", "memory"),
            ("PHOTO_STORE_BACKEND", "memory"),
            ("LOCAL_STORAGE_BASE_URL", "https://cdn.example.test/media"),
            ("WATERMARK_POLICY", "fallback_plain"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_map(&vars).unwrap()
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([10, 20, 30]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        Bytes::from(buffer.into_inner())
    }

    #[tokio::test]
    async fn memory_services_upload_and_process_end_to_end() {
        let services = Services::from_config(memory_config(&[])).await.unwrap();
        let classroom = Uuid::new_v4();

        let result = services
            .uploads
            .upload_batch(
                classroom,
                vec![UploadFile::new("group.png", "image/png", png(1800, 1200))],
            )
            .await;
        assert!(result.success);

        let report = services.runner.run_batch().await.unwrap();
        assert_eq!(report.success_count, 1);

        let photos = services.photos.list_by_classroom(classroom).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!((photos[0].width, photos[0].height), (1500, 1000));
        assert!(photos[0]
            .watermarked_url
            .starts_with("https://cdn.example.test/media/processed/"));
    }

    #[tokio::test]
    async fn postgres_backend_without_url_is_rejected() {
        let config = memory_config(&[("QUEUE_BACKEND", "postgres")]);
        let err = Services::from_config(config).await.err().unwrap();
        assert!(format!("{:#}", err).contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn scheduler_takes_the_wake_receiver_once() {
        let mut services = Services::from_config(memory_config(&[])).await.unwrap();
        assert!(services.wake_rx.is_some());
        let _scheduler = services.scheduler();
        assert!(services.wake_rx.is_none());
    }
}
