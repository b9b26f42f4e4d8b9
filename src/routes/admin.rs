/**
 * Admin Routes
 * Session-guarded form actions for posts, linked content and the portfolio,
 * plus the JSON reads backing the editor
 */
use axum::{
    extract::{Path, State},
    response::Redirect,
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::authoring::posts::{self, DeleteForm, LinkForm, PostForm};
use crate::authoring::{site, FormPayload};
use crate::content::{AdminPostSummary, ContentStatus};
use crate::error::{AppError, AppResult};
use crate::repo::ContentRepo;
use crate::session::AdminSession;
use crate::state::AppState;

// ============================================================================
// Post and linked-content actions
// ============================================================================

/// POST /admin/posts
pub async fn create_post(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    tracing::debug!(admin = %session.email, "create post");
    let location = posts::create_post(state.content.as_ref(), &form).await?;
    Ok(Redirect::to(&location))
}

/// POST /admin/posts/update
pub async fn update_post(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    tracing::debug!(admin = %session.email, id = %form.id, "update post");
    let location = posts::update_post(state.content.as_ref(), &form).await?;
    Ok(Redirect::to(&location))
}

/// POST /admin/linked
pub async fn create_linked_content(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<LinkForm>,
) -> AppResult<Redirect> {
    tracing::debug!(admin = %session.email, kind = %form.kind, "create linked content");
    let location = posts::create_linked_content(state.content.as_ref(), &form).await?;
    Ok(Redirect::to(&location))
}

/// POST /admin/content/delete
pub async fn delete_content(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<DeleteForm>,
) -> AppResult<Redirect> {
    tracing::debug!(admin = %session.email, id = %form.id, "delete content");
    let location = posts::delete_content(state.content.as_ref(), &form).await?;
    Ok(Redirect::to(&location))
}

// ============================================================================
// Portfolio actions
// ============================================================================

/// POST /admin/site
pub async fn save_site(
    State(state): State<AppState>,
    session: AdminSession,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    tracing::debug!(admin = %session.email, fields = pairs.len(), "save site");
    let location = site::save_site(state.portfolio.as_ref(), &FormPayload::from(pairs)).await?;
    Ok(Redirect::to(&location))
}

/// POST /admin/hero
pub async fn update_hero(
    State(state): State<AppState>,
    _session: AdminSession,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let location = site::update_hero(state.portfolio.as_ref(), &FormPayload::from(pairs)).await?;
    Ok(Redirect::to(&location))
}

/// POST /admin/about
pub async fn update_about(
    State(state): State<AppState>,
    _session: AdminSession,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let location = site::update_about(state.portfolio.as_ref(), &FormPayload::from(pairs)).await?;
    Ok(Redirect::to(&location))
}

// ============================================================================
// Editor reads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostList {
    pub posts: Vec<AdminPostSummary>,
}

/// Everything the post editor needs to re-populate its form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub status: ContentStatus,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub content_md: String,
    pub cover_image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// GET /admin/posts
pub async fn list_posts(
    State(state): State<AppState>,
    _session: AdminSession,
) -> AppResult<Json<AdminPostList>> {
    let posts = state.content.admin_posts().await?;
    Ok(Json(AdminPostList { posts }))
}

/// GET /admin/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<String>,
) -> AppResult<Json<AdminPostDetail>> {
    let not_found = || AppError::NotFound("Post not found".to_string());
    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    let item = state.content.post_by_id(id).await?.ok_or_else(not_found)?;
    let post = item.post().ok_or_else(not_found)?;

    Ok(Json(AdminPostDetail {
        id: item.id,
        title: item.title.clone().unwrap_or_default(),
        slug: post.slug.clone(),
        status: item.status,
        excerpt: item.excerpt.clone().unwrap_or_default(),
        tags: item.tags.clone(),
        content_md: post.content_md.clone(),
        cover_image_url: post.cover_image_url.clone(),
        published_at: item.published_at,
        updated_at: item.updated_at,
    }))
}
