use crate::config::FolioConfig;
use crate::database::sqlite::SqliteRepository;
use crate::features::admin::admin_router;
use crate::features::auth::{AdminVerifier, SupabaseAuth};
use crate::features::posts::posts_router;
use crate::io::mirror::PostMirror;
use crate::io::supabase::SupabaseBucket;
use crate::io::ContentStore;
use crate::services::sync::SyncService;
use crate::services::{NoopRevalidator, RevalidationNotifier, WebhookRevalidator};
use anyhow::{Context, Result};
use axum::Router;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Sqlite;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub mod config;
mod database;
mod domain;
mod features;
mod io;
mod pagination;
mod parser;
mod services;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub sync_service: Arc<SyncService>,
    pub images: Arc<dyn ContentStore>,
    pub verifier: Arc<dyn AdminVerifier>,
    pub config: Arc<FolioConfig>,
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .context("Failed to initialize logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    // determine environment variables
    dotenv::dotenv().ok();
    init_logging()?;

    // load centralized config
    let config = Arc::new(FolioConfig::from_env()?);

    // verify db exists
    if !Sqlite::database_exists(&config.database_url)
        .await
        .unwrap_or(false)
    {
        info!(url = %config.database_url, "database missing, creating");
        Sqlite::create_database(&config.database_url)
            .await
            .with_context(|| format!("Unable to create database at {}", config.database_url))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to create pool on {}", config.database_url))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let posts_bucket = SupabaseBucket::new(
        &config.supabase_url,
        &config.supabase_key,
        &config.posts_bucket,
        config.request_timeout,
    )?;
    let images_bucket = SupabaseBucket::new(
        &config.supabase_url,
        &config.supabase_key,
        &config.images_bucket,
        config.request_timeout,
    )?;

    let notifier: Box<dyn RevalidationNotifier> = match &config.revalidate_url {
        Some(url) => Box::new(WebhookRevalidator::new(
            url.clone(),
            config.revalidate_secret.clone(),
            config.request_timeout,
        )?),
        None => Box::new(NoopRevalidator),
    };

    let sync_service = Arc::new(SyncService::new(
        Box::new(posts_bucket),
        Box::new(SqliteRepository::new(pool.clone())),
        notifier,
        PostMirror::new(config.content_dir.clone()),
        config.clone(),
    ));

    // bring the database and mirror in line with the bucket before serving
    match sync_service.reconcile().await {
        Ok(report) if report.is_clean() => info!(changes = report.changes(), "initial sync complete"),
        Ok(report) => warn!(
            changes = report.changes(),
            errors = report.errors.len(),
            "initial sync completed with errors"
        ),
        Err(e) => error!(error = %format!("{:#}", e), "initial sync failed, serving last known posts"),
    }

    info!(mirror = %sync_service.mirror().path().display(), "serving posts from mirror");

    let verifier = Arc::new(SupabaseAuth::new(
        &config.supabase_url,
        &config.supabase_key,
        config.request_timeout,
    )?);

    let app_state = AppState {
        sync_service,
        images: Arc::new(images_bucket),
        verifier,
        config: config.clone(),
    };

    // api router, where features are composed
    let api_router = Router::new()
        .nest("/posts", posts_router())
        .nest("/admin", admin_router(app_state.clone()));

    let mut app = Router::new().nest("/api", api_router);
    if let Some(frontend_path) = &config.frontend_path {
        app = app.fallback_service(ServeDir::new(frontend_path));
    }
    let app = app
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
