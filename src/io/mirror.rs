use crate::domain::Post;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

pub const MIRROR_FILENAME: &str = "blog.json";
const MIRROR_STAGING_FILENAME: &str = "blog.json.tmp";

// exists so listings and post pages can be served without hitting the database or the bucket
pub struct PostMirror {
    dir: PathBuf,
}

impl PostMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(MIRROR_FILENAME)
    }

    /// Overwrites the mirror with the complete record set.
    ///
    /// The new set is written beside the old one and renamed over it, so readers never see a
    /// partial file.
    pub async fn write(&self, posts: &[Post]) -> Result<()> {
        let json = serde_json::to_string(posts).context("Failed to serialize post mirror")?;
        let staged = self.dir.join(MIRROR_STAGING_FILENAME);

        fs::write(&staged, json)
            .await
            .with_context(|| format!("Failed to stage post mirror {}", staged.display()))?;
        fs::rename(&staged, self.path())
            .await
            .with_context(|| format!("Failed to replace post mirror {}", self.path().display()))
    }

    /// `None` when no pass has written the mirror yet.
    pub async fn read(&self) -> Result<Option<Vec<Post>>> {
        let raw = match fs::read_to_string(self.path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read post mirror {}", self.path().display())
                })
            }
        };

        let posts = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt post mirror {}", self.path().display()))?;
        Ok(Some(posts))
    }

    fn body_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.md", slug))
    }

    /// Returns the cached markdown for `post`, or `None` if it is missing or belongs to an older
    /// revision of the file.
    pub async fn read_body(&self, post: &Post) -> Result<Option<String>> {
        let raw = match fs::read_to_string(self.body_path(&post.slug)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(format!("Failed to read cached body {}", post.slug)),
        };

        if content_hash(&raw) != post.content_hash {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    pub async fn write_body(&self, slug: &str, raw_markdown: &str) -> Result<()> {
        fs::write(self.body_path(slug), raw_markdown)
            .await
            .with_context(|| format!("Failed to cache body of {}", slug))
    }

    pub async fn prune_bodies(&self, slugs: &[String]) -> Result<()> {
        for slug in slugs {
            match fs::remove_file(self.body_path(slug)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).context(format!("Failed to prune cached body {}", slug)),
            }
        }
        Ok(())
    }
}

pub fn content_hash(raw_markdown: &str) -> String {
    format!(
        "{:016x}",
        xxhash_rust::xxh3::xxh3_64(raw_markdown.as_bytes())
    )
}
