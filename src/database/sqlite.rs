use crate::database::model::DbPost;
use crate::database::PostRepository;
use crate::domain::{Post, PostQuery};
use crate::pagination::page_offset;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, name, slug, title, description, date, updated, link, image, \
                            tags, is_full, content_hash, created_at, updated_at";

// ?1 is the raw search term, ?2 the escaped LIKE pattern
const SEARCH_FILTER: &str = r#"
    (?1 IS NULL
        OR title LIKE ?2 ESCAPE '\'
        OR description LIKE ?2 ESCAPE '\'
        OR EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE lower(json_each.value) = lower(?1)))
"#;

pub struct SqliteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(|q| {
        let escaped = q
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

// (limit, offset); sqlite treats a negative limit as "no limit"
fn limit_offset(query: &PostQuery) -> (i64, i64) {
    match (query.page, query.per_page) {
        (Some(page), Some(per_page)) if per_page > 0 => (
            i64::from(per_page),
            i64::try_from(page_offset(page, per_page)).unwrap_or(i64::MAX),
        ),
        _ => (-1, 0),
    }
}

#[async_trait]
impl PostRepository for SqliteRepository {
    async fn find_many(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let search = query.search();
        let (limit, offset) = limit_offset(query);

        let sql = format!(
            "SELECT {} FROM posts WHERE {} ORDER BY date DESC, slug ASC LIMIT ?3 OFFSET ?4",
            POST_COLUMNS, SEARCH_FILTER
        );

        let rows = sqlx::query_as::<_, DbPost>(&sql)
            .bind(search)
            .bind(like_pattern(search))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query posts")?;

        // translate to pure Post models
        rows.into_iter().map(Post::try_from).collect()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
        let row = sqlx::query_as::<_, DbPost>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load post {}", slug))?;

        row.map(Post::try_from).transpose()
    }

    async fn count(&self, query: &PostQuery) -> Result<u64> {
        let search = query.search();
        let sql = format!("SELECT COUNT(*) FROM posts WHERE {}", SEARCH_FILTER);

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search)
            .bind(like_pattern(search))
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn upsert(&self, post: &Post) -> Result<Post> {
        // translate the pure Post down into a DbPost for SQLite
        let row: DbPost = post.into();

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, name, slug, title, description, date, updated, link, image,
                tags, is_full, content_hash, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                title = excluded.title,
                description = excluded.description,
                date = excluded.date,
                updated = excluded.updated,
                link = excluded.link,
                image = excluded.image,
                tags = excluded.tags,
                is_full = excluded.is_full,
                content_hash = excluded.content_hash,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.slug)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.date)
        .bind(row.updated)
        .bind(&row.link)
        .bind(&row.image)
        .bind(&row.tags)
        .bind(row.is_full)
        .bind(&row.content_hash)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save post {}", post.slug))?;

        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete post {}", id))?;

        if result.rows_affected() == 0 {
            bail!("No post with id {} to delete", id);
        }

        Ok(())
    }
}
