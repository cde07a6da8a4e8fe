//! In-process wake channel

use proofline_core::WakeTrigger;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Wake trigger backed by a capacity-one channel.
///
/// Any number of fires between two scheduler passes collapse into a single
/// pending wake. `fire` never blocks.
#[derive(Clone)]
pub struct ChannelWake {
    tx: mpsc::Sender<()>,
}

impl ChannelWake {
    /// Returns the trigger and the receiver to hand to the [`crate::Scheduler`].
    pub fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }
}

impl WakeTrigger for ChannelWake {
    fn fire(&self) {
        match self.tx.try_send(()) {
            Ok(()) => tracing::trace!("Worker wake queued"),
            Err(TrySendError::Full(())) => tracing::trace!("Worker wake already pending"),
            Err(TrySendError::Closed(())) => {
                tracing::debug!("Worker wake receiver dropped, relying on scheduler")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_fires_coalesce() {
        let (wake, mut rx) = ChannelWake::channel();
        wake.fire();
        wake.fire();
        wake.fire();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fire_after_receiver_dropped_is_silent() {
        let (wake, rx) = ChannelWake::channel();
        drop(rx);
        wake.fire();
    }
}
