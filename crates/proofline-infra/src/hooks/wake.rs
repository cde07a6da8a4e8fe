use proofline_core::WakeTrigger;
use std::sync::Arc;

/// Fire-and-forget `POST` to a worker's run endpoint.
///
/// The request runs on a detached task so `fire` returns immediately. Delivery
/// failures are logged and otherwise ignored; the periodic scheduler picks the
/// work up regardless.
#[derive(Clone)]
pub struct HttpWakeTrigger {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl HttpWakeTrigger {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                client: super::build_client()?,
                url: url.into(),
                secret,
            }),
        })
    }
}

impl WakeTrigger for HttpWakeTrigger {
    fn fire(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, skipping worker wake");
            return;
        };

        let inner = self.inner.clone();
        handle.spawn(async move {
            let mut request = inner.client.post(&inner.url);
            if let Some(secret) = &inner.secret {
                request = request.bearer_auth(secret);
            }
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %inner.url, "Worker wake delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %inner.url,
                        status = %response.status(),
                        "Worker wake rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %inner.url, error = %e, "Worker wake failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::spawn_receiver;
    use std::time::Duration;

    #[tokio::test]
    async fn fire_posts_in_background() {
        let (url, inbox) = spawn_receiver().await;
        let trigger = HttpWakeTrigger::new(url, Some("worker-secret".into())).unwrap();

        trigger.fire();

        for _ in 0..50 {
            if !inbox.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let received = inbox.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].authorization.as_deref(),
            Some("Bearer worker-secret")
        );
    }

    #[test]
    fn fire_without_runtime_is_a_no_op() {
        let trigger = HttpWakeTrigger::new("http://127.0.0.1:9/wake", None).unwrap();
        trigger.fire();
    }
}
