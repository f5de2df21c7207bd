use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const POST_EXTENSION: &str = ".md";

/// The metadata mirror of one markdown file in the posts bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub full: bool,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One object as reported by the content store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFile {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageFile {
    /// The slug this file backs, if it is a post file at all.
    pub fn slug(&self) -> Option<&str> {
        slug_from_filename(&self.name)
    }
}

pub fn slug_from_filename(name: &str) -> Option<&str> {
    name.strip_suffix(POST_EXTENSION)
        .filter(|slug| !slug.is_empty() && !slug.contains('/'))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PostQuery {
    pub fn search(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self.search() {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                post.title.to_lowercase().contains(&needle)
                    || post.description.to_lowercase().contains(&needle)
                    || post.tags.iter().any(|t| t.eq_ignore_ascii_case(q))
            }
        }
    }
}

// newest first, slug as the tie breaker so listings are stable
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
}
