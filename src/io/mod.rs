use crate::domain::StorageFile;
use anyhow::Result;
use async_trait::async_trait;

pub mod mirror;
pub mod supabase;

// one bucket of the object store; posts and images each get their own
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<StorageFile>>;
    fn public_url(&self, name: &str) -> String;
    async fn fetch(&self, name: &str) -> Result<String>;
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    // names already under `archive/` that contain `search`
    async fn list_archive(&self, search: &str) -> Result<Vec<String>>;
    async fn move_object(&self, from: &str, to: &str) -> Result<()>;
}

pub const ARCHIVE_PREFIX: &str = "archive";

/// Picks the archive destination for `filename`, numbering it when earlier copies exist.
///
/// `post.md` becomes `archive/post.md`, then `archive/post (2).md`, `archive/post (3).md`...
pub fn archive_destination(filename: &str, existing: usize) -> String {
    let (stem, ext) = match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    };
    let suffix = if existing > 0 {
        format!(" ({})", existing + 1)
    } else {
        String::new()
    };
    format!("{}/{}{}{}", ARCHIVE_PREFIX, stem, suffix, ext)
}

/// Moves `filename` into the bucket's archive folder instead of deleting it.
pub async fn archive_object(store: &dyn ContentStore, filename: &str) -> Result<String> {
    let stem = filename
        .rfind('.')
        .map(|idx| &filename[..idx])
        .unwrap_or(filename);
    let existing = store.list_archive(stem).await?;
    let destination = archive_destination(filename, existing.len());
    store.move_object(filename, &destination).await?;
    Ok(destination)
}
