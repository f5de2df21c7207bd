use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

pub mod sync;

// tells the frontend which rendered paths are stale after content changed
#[async_trait]
pub trait RevalidationNotifier: Send + Sync {
    async fn notify(&self, paths: &[String]) -> Result<()>;
}

pub struct WebhookRevalidator {
    pub client: Client,
    pub url: String,
    pub secret: String,
}

impl WebhookRevalidator {
    pub fn new(url: String, secret: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build revalidation HTTP client")?;
        Ok(Self {
            client,
            url,
            secret,
        })
    }
}

#[async_trait]
impl RevalidationNotifier for WebhookRevalidator {
    async fn notify(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut url = Url::parse(&self.url)
            .with_context(|| format!("Invalid revalidation url {}", self.url))?;
        {
            let mut query = url.query_pairs_mut();
            for path in paths {
                query.append_pair("path", path);
            }
        }

        info!(url = %self.url, paths = paths.len(), "triggering revalidation");
        let res = self
            .client
            .get(url)
            .bearer_auth(&self.secret)
            .send()
            .await;

        match res {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                bail!("Frontend rejected revalidation request. Status: {}", response.status());
            }
            Err(e) => {
                bail!("Failed to connect to revalidation webhook: {}", e);
            }
        }
    }
}

// used when no webhook is configured
pub struct NoopRevalidator;

#[async_trait]
impl RevalidationNotifier for NoopRevalidator {
    async fn notify(&self, _paths: &[String]) -> Result<()> {
        Ok(())
    }
}
