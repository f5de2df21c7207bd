use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct FolioConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub frontend_path: Option<PathBuf>,
    pub content_dir: PathBuf,
    pub supabase_url: String,
    pub supabase_key: String,
    pub posts_bucket: String,
    pub images_bucket: String,
    pub revalidate_url: Option<String>,
    pub revalidate_secret: String,
    pub request_timeout: Duration,
    pub posts_per_page: u32,
}

impl FolioConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("Failed to determine DATABASE_URL from environment variables")?;

        let max_connections = std::env::var("MAX_CONNECTIONS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(15);

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let frontend_path = std::env::var("FRONTEND_DIST_PATH").ok().map(PathBuf::from);

        let content_dir = resolve_content_dir(
            &std::env::var("CONTENT_DIR").unwrap_or_else(|_| "./content".to_string()),
        );

        let supabase_url = std::env::var("SUPABASE_URL")
            .context("Failed to determine SUPABASE_URL from environment variables")?
            .trim_end_matches('/')
            .to_string();

        let supabase_key = std::env::var("SUPABASE_KEY")
            .context("Failed to determine SUPABASE_KEY from environment variables")?;

        let posts_bucket = std::env::var("POSTS_BUCKET").unwrap_or_else(|_| "blog".to_string());
        let images_bucket =
            std::env::var("IMAGES_BUCKET").unwrap_or_else(|_| "images".to_string());

        let revalidate_url = std::env::var("REVALIDATE_URL")
            .ok()
            .filter(|url| !url.is_empty());

        let revalidate_secret = std::env::var("REVALIDATE_SECRET").unwrap_or_default();

        let request_timeout = Duration::from_secs(
            std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(10),
        );

        let posts_per_page = std::env::var("POSTS_PER_PAGE")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10);

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            frontend_path,
            content_dir,
            supabase_url,
            supabase_key,
            posts_bucket,
            images_bucket,
            revalidate_url,
            revalidate_secret,
            request_timeout,
            posts_per_page,
        })
    }
}

// the configured directory may not exist on read-only deployments; fall back to the temp dir
pub fn resolve_content_dir(configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_dir() {
        path.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}
