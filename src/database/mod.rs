use crate::domain::{Post, PostQuery};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod model;
pub mod sqlite;

// the relational copy of the post metadata; sqlx::Pool is thread safe so implementations can be
// shared between the sync service and the routers
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_many(&self, query: &PostQuery) -> Result<Vec<Post>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    async fn count(&self, query: &PostQuery) -> Result<u64>;

    // write operations
    async fn upsert(&self, post: &Post) -> Result<Post>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}
