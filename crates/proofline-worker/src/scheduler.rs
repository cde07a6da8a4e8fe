//! Periodic batch scheduler
//!
//! The scheduler is the system of record for eventual processing: it runs a pass
//! every `interval` whether or not any wake arrives. Wakes only shorten the wait.
//! A pass that fills its batch is followed immediately by another until the
//! queue drains or shutdown is requested.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::runner::BatchRunner;

pub struct Scheduler {
    runner: BatchRunner,
    interval: Duration,
    wake_rx: Option<mpsc::Receiver<()>>,
}

impl Scheduler {
    pub fn new(runner: BatchRunner, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            wake_rx: None,
        }
    }

    /// Also run a pass whenever the paired [`crate::ChannelWake`] fires.
    pub fn with_wake(mut self, wake_rx: mpsc::Receiver<()>) -> Self {
        self.wake_rx = Some(wake_rx);
        self
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            wake = self.wake_rx.is_some(),
            "Worker scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let trigger = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => Trigger::Tick,
                woke = recv_wake(&mut self.wake_rx) => match woke {
                    Some(()) => Trigger::Wake,
                    None => Trigger::WakeClosed,
                },
            };

            match trigger {
                Trigger::Tick => tracing::debug!("Scheduled pass"),
                Trigger::Wake => tracing::debug!("Woken for pass"),
                Trigger::WakeClosed => {
                    tracing::debug!("Wake channel closed, continuing on schedule only");
                    self.wake_rx = None;
                    continue;
                }
            }

            self.drain(&shutdown).await;
        }

        tracing::info!("Worker scheduler stopped");
    }

    async fn drain(&self, shutdown: &CancellationToken) {
        let batch_size = self.runner.config().batch_size;
        loop {
            match self.runner.run_batch().await {
                Ok(report) if report.processed_count >= batch_size && !shutdown.is_cancelled() => {
                    continue;
                }
                Ok(_) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Batch pass failed");
                    break;
                }
            }
        }
    }
}

enum Trigger {
    Tick,
    Wake,
    WakeClosed,
}

async fn recv_wake(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalizer::MetadataFinalizer;
    use crate::runner::RunnerConfig;
    use crate::wake::ChannelWake;
    use bytes::Bytes;
    use proofline_core::{
        JobPayload, NoOpCacheInvalidator, WakeTrigger, WatermarkPolicy, WorkQueue,
    };
    use proofline_db::{MemoryPhotoRepository, MemoryWorkQueue};
    use proofline_storage::{MemoryStorage, Storage};
    use std::sync::Arc;
    use uuid::Uuid;

    fn tiny_png() -> Bytes {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            16,
            12,
            image::Rgb([90, 120, 200]),
        ));
        let mut buffer = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        Bytes::from(buffer.into_inner())
    }

    #[tokio::test]
    async fn wake_triggers_a_pass_before_the_interval() {
        let storage = Arc::new(MemoryStorage::default());
        let queue = Arc::new(MemoryWorkQueue::new("photo_processing"));
        let photos = Arc::new(MemoryPhotoRepository::new());
        let finalizer = Arc::new(MetadataFinalizer::new(
            photos.clone(),
            Arc::new(NoOpCacheInvalidator),
        ));
        let mut config = RunnerConfig::default();
        config.transform.policy = WatermarkPolicy::FallbackPlain;
        let runner = BatchRunner::new(queue.clone(), storage.clone(), finalizer, config);

        let (wake, wake_rx) = ChannelWake::channel();
        let shutdown = CancellationToken::new();
        let scheduler = Scheduler::new(runner, Duration::from_secs(3600)).with_wake(wake_rx);
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // Let the immediate first tick drain the empty queue.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let classroom = Uuid::new_v4();
        let path = format!("originals/{}/{}.png", classroom, Uuid::new_v4());
        storage
            .upload(&path, tiny_png(), "image/png", false)
            .await
            .unwrap();
        queue
            .enqueue(&JobPayload {
                original_path: path,
                classroom_id: classroom,
                width: None,
                height: None,
                alt_text: None,
            })
            .await
            .unwrap();
        wake.fire();

        for _ in 0..100 {
            if photos.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(photos.len(), 1);
        assert_eq!(queue.stats().await.unwrap().archived, 1);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
