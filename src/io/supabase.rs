use crate::domain::StorageFile;
use crate::io::{ContentStore, ARCHIVE_PREFIX};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const LIST_LIMIT: u32 = 1000;

// the storage API reports folders as entries without an id or timestamps
#[derive(Deserialize, Debug)]
pub struct ObjectEntry {
    pub name: String,
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Keeps the real objects of a listing, dropping folder placeholders.
pub fn files_from_entries(entries: Vec<ObjectEntry>) -> Vec<StorageFile> {
    entries
        .into_iter()
        .filter_map(|entry| match (entry.id, entry.created_at, entry.updated_at) {
            (Some(_), Some(created_at), Some(updated_at)) => Some(StorageFile {
                name: entry.name,
                created_at,
                updated_at,
            }),
            _ => None,
        })
        .collect()
}

#[derive(Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    search: &'a str,
    limit: u32,
    offset: u32,
    #[serde(rename = "sortBy")]
    sort_by: SortBy<'a>,
}

#[derive(Serialize)]
struct MoveRequest<'a> {
    #[serde(rename = "bucketId")]
    bucket_id: &'a str,
    #[serde(rename = "sourceKey")]
    source_key: &'a str,
    #[serde(rename = "destinationKey")]
    destination_key: &'a str,
}

/// A Supabase Storage bucket accessed over its REST API.
pub struct SupabaseBucket {
    client: Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl SupabaseBucket {
    pub fn new(base_url: &str, key: &str, bucket: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build storage HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid storage base url {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Storage base url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(segments.iter().flat_map(|s| s.split('/')));
        Ok(url)
    }

    /// Public download url of `name`, stamped with `at` so the CDN in front of public objects
    /// can't serve a stale copy.
    pub fn fetch_url(&self, name: &str, at: DateTime<Utc>) -> Result<Url> {
        let mut url = self.endpoint(&["public", &self.bucket, name])?;
        url.query_pairs_mut()
            .append_pair("t", &at.timestamp_millis().to_string());
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("apikey", &self.key).bearer_auth(&self.key)
    }

    async fn list_prefix(&self, prefix: &str, search: &str) -> Result<Vec<ObjectEntry>> {
        let url = self.endpoint(&["list", &self.bucket])?;
        let body = ListRequest {
            prefix,
            search,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to list bucket {}", self.bucket))?;

        if !response.status().is_success() {
            bail!(
                "Storage rejected listing of bucket {}. Status: {}",
                self.bucket,
                response.status()
            );
        }

        response
            .json::<Vec<ObjectEntry>>()
            .await
            .with_context(|| format!("Failed to decode listing of bucket {}", self.bucket))
    }
}

#[async_trait]
impl ContentStore for SupabaseBucket {
    async fn list(&self) -> Result<Vec<StorageFile>> {
        let entries = self.list_prefix("", "").await?;
        debug!(bucket = %self.bucket, entries = entries.len(), "listed bucket");

        Ok(files_from_entries(entries))
    }

    fn public_url(&self, name: &str) -> String {
        self.endpoint(&["public", &self.bucket, name])
            .map(String::from)
            .unwrap_or_else(|_| {
                format!(
                    "{}/storage/v1/object/public/{}/{}",
                    self.base_url, self.bucket, name
                )
            })
    }

    async fn fetch(&self, name: &str) -> Result<String> {
        let url = self.fetch_url(name, Utc::now())?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", name))?;

        if !response.status().is_success() {
            bail!("Download of {} failed. Status: {}", name, response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", name))
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.endpoint(&[&self.bucket, name])?;

        let response = self
            .authorized(self.client.post(url))
            .header("x-upsert", "true")
            .header(http::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", name))?;

        if !response.status().is_success() {
            bail!("Upload of {} rejected. Status: {}", name, response.status());
        }

        Ok(())
    }

    async fn list_archive(&self, search: &str) -> Result<Vec<String>> {
        let entries = self.list_prefix(ARCHIVE_PREFIX, search).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.id.is_some())
            .map(|entry| entry.name)
            .collect())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        let url = self.endpoint(&["move"])?;
        let body = MoveRequest {
            bucket_id: &self.bucket,
            source_key: from,
            destination_key: to,
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to move {} to {}", from, to))?;

        if !response.status().is_success() {
            bail!("Move of {} rejected. Status: {}", from, response.status());
        }

        Ok(())
    }
}
