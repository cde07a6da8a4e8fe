use async_trait::async_trait;
use proofline_core::CacheInvalidator;
use serde::Serialize;
use uuid::Uuid;

/// Asks the storefront to revalidate cached classroom galleries.
///
/// Sends `POST {url}` with `{"classroom_ids": [...]}` and an optional bearer secret.
pub struct HttpCacheInvalidator {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

#[derive(Serialize)]
struct RevalidateRequest<'a> {
    classroom_ids: &'a [Uuid],
}

impl HttpCacheInvalidator {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client()?,
            url: url.into(),
            secret,
        })
    }
}

#[async_trait]
impl CacheInvalidator for HttpCacheInvalidator {
    #[tracing::instrument(skip(self, classroom_ids), fields(classrooms = classroom_ids.len()))]
    async fn invalidate_classrooms(&self, classroom_ids: &[Uuid]) -> Result<(), String> {
        if classroom_ids.is_empty() {
            return Ok(());
        }

        let mut request = self
            .client
            .post(&self.url)
            .json(&RevalidateRequest { classroom_ids });
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Cache revalidation request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Cache revalidation returned HTTP {}", status));
        }

        tracing::debug!(status = %status, "Classroom caches revalidated");
        Ok(())
    }
}
