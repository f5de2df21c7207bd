pub mod model;

use crate::domain::PostQuery;
use crate::features::error::ApiError;
use crate::pagination::{build_page_range, total_pages};
use crate::parser::markdown::{compile_markdown_to_html, extract_frontmatter};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use model::{PostListResponse, PostResponse};

pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts_handler))
        .route("/{slug}", get(get_post_handler))
}

async fn list_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let per_page = query
        .per_page
        .filter(|n| *n > 0)
        .unwrap_or(state.config.posts_per_page);
    let page = query.page.unwrap_or(1).max(1);

    let query = PostQuery {
        query: query.query,
        page: Some(page),
        per_page: Some(per_page),
    };
    let (posts, total) = state.sync_service.list_posts(&query).await?;
    let pages = total_pages(total, per_page);

    Ok(Json(PostListResponse {
        posts,
        total,
        page,
        pages,
        pager: build_page_range(page, pages),
    }))
}

async fn get_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .sync_service
        .find_post(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Post '{}'", slug)))?;

    let raw = state.sync_service.load_body(&post).await?;
    let (_, body) = extract_frontmatter(&raw, &post.name).map_err(anyhow::Error::from)?;

    Ok(Json(PostResponse {
        html_content: compile_markdown_to_html(&body),
        post,
    }))
}
