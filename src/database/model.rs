use crate::domain::Post;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use derive_more::derive::Display;
use uuid::Uuid;

// row shape of the `posts` table; tags are stored as a JSON array string
#[derive(sqlx::FromRow, Debug, Eq, PartialEq, Clone, Display)]
#[display("{}", slug)]
pub struct DbPost {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: String,
    pub is_full: bool,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Post> for DbPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.to_string(),
            name: post.name.clone(),
            slug: post.slug.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            date: post.date,
            updated: post.updated,
            link: post.link.clone(),
            image: post.image.clone(),
            tags: serde_json::to_string(&post.tags).unwrap_or_else(|_| "[]".to_string()),
            is_full: post.full,
            content_hash: post.content_hash.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl TryFrom<DbPost> for Post {
    type Error = anyhow::Error;

    fn try_from(row: DbPost) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .with_context(|| format!("Post {} has a malformed id '{}'", row, row.id))?;
        let tags: Vec<String> = serde_json::from_str(&row.tags)
            .with_context(|| format!("Post {} has malformed tags", row))?;

        Ok(Post {
            id,
            name: row.name,
            slug: row.slug,
            title: row.title,
            description: row.description,
            date: row.date,
            updated: row.updated,
            link: row.link,
            image: row.image,
            tags,
            full: row.is_full,
            content_hash: row.content_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
