use crate::domain::post::{slug_from_filename, POST_EXTENSION};
use crate::features::auth::{require_admin, AdminUser};
use crate::features::error::ApiError;
use crate::io::archive_object;
use crate::parser::markdown::parse_post;
use crate::services::sync::ReconcileReport;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "webp"];

#[derive(Serialize, Debug)]
pub struct ImageEntry {
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/posts/refresh", post(refresh_posts_handler))
        .route(
            "/posts/{name}",
            put(upload_post_handler).delete(archive_post_handler),
        )
        .route("/images", get(list_images_handler))
        .route(
            "/images/{name}",
            put(upload_image_handler).delete(archive_image_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

async fn refresh_posts_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AdminUser>,
) -> Result<Json<ReconcileReport>, ApiError> {
    info!(by = %user.id, "manual refresh requested");
    let report = state.sync_service.reconcile().await?;
    Ok(Json(report))
}

async fn upload_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AdminUser>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<ReconcileReport>, ApiError> {
    if slug_from_filename(&filename).is_none() {
        return Err(ApiError::BadRequest("Invalid file extension".into()));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("No file".into()));
    }

    let markdown = std::str::from_utf8(&body)
        .map_err(|_| ApiError::BadRequest("Post must be UTF-8 text".into()))?;
    parse_post(markdown, &filename).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .sync_service
        .store()
        .upload(&filename, body.to_vec(), "text/markdown")
        .await?;
    info!(file = %filename, by = %user.id, "post uploaded");

    let report = state.sync_service.reconcile().await?;
    Ok(Json(report))
}

// `name` is the slug; the post file is moved to the archive rather than deleted
async fn archive_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AdminUser>,
    Path(slug): Path<String>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let filename = format!("{}{}", slug, POST_EXTENSION);
    if slug_from_filename(&filename).is_none() {
        return Err(ApiError::BadRequest(format!("Invalid slug '{}'", slug)));
    }

    let destination = archive_object(state.sync_service.store(), &filename).await?;
    info!(file = %filename, to = %destination, by = %user.id, "post archived");

    let report = state.sync_service.reconcile().await?;
    Ok(Json(report))
}

async fn list_images_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageEntry>>, ApiError> {
    let files = state.images.list().await?;
    let images = files
        .into_iter()
        .filter(|file| image_extension(&file.name).is_some())
        .map(|file| ImageEntry {
            url: state.images.public_url(&file.name),
            name: file.name,
            created_at: file.created_at,
            updated_at: file.updated_at,
        })
        .collect();
    Ok(Json(images))
}

async fn upload_image_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AdminUser>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let ext = image_extension(&filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid file extension".into()))?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("No file".into()));
    }
    check_image_bytes(&ext, &body)?;

    state
        .images
        .upload(&filename, body.to_vec(), image_content_type(&ext))
        .await?;
    info!(file = %filename, by = %user.id, "image uploaded");

    Ok(Json(json!({ "success": true, "error": "" })))
}

async fn archive_image_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AdminUser>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if image_extension(&filename).is_none() {
        return Err(ApiError::BadRequest("Invalid file extension".into()));
    }

    let destination = archive_object(state.images.as_ref(), &filename).await?;
    info!(file = %filename, to = %destination, by = %user.id, "image archived");

    Ok(Json(json!({ "success": true, "error": "" })))
}

// lower-cased extension of an allowed, top-level image name
pub fn image_extension(filename: &str) -> Option<String> {
    if filename.contains('/') || filename.starts_with('.') {
        return None;
    }
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn image_content_type(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Rejects uploads whose bytes don't match the format their name claims.
pub fn check_image_bytes(ext: &str, bytes: &[u8]) -> Result<(), ApiError> {
    if ext == "svg" {
        let looks_like_svg = std::str::from_utf8(bytes)
            .map(|text| text.contains("<svg"))
            .unwrap_or(false);
        return if looks_like_svg {
            Ok(())
        } else {
            Err(ApiError::BadRequest("File is not an SVG document".into()))
        };
    }

    let claimed = ImageFormat::from_extension(ext)
        .ok_or_else(|| ApiError::BadRequest(format!("Unsupported image type .{}", ext)))?;
    match image::guess_format(bytes) {
        Ok(actual) if actual == claimed => Ok(()),
        Ok(actual) => Err(ApiError::BadRequest(format!(
            "File content is {:?}, not .{}",
            actual, ext
        ))),
        Err(_) => Err(ApiError::BadRequest("File is not a recognised image".into())),
    }
}
