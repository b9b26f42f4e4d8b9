/**
 * Content Routes
 * Public feed of published posts, external links and bookmarks
 */
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::content::{available_tags, ContentCard, FeedFilter, PostDetail};
use crate::error::{AppError, AppResult};
use crate::repo::ContentRepo;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<String>,
}

impl FeedQuery {
    /// Positive limits only; anything else means the whole feed.
    fn limit(&self) -> Option<i64> {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<ContentCard>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

async fn published_cards(repo: &dyn ContentRepo, limit: Option<i64>) -> AppResult<Vec<ContentCard>> {
    let items = repo.published_items(limit).await?;
    Ok(items.iter().map(ContentCard::from).collect())
}

/// GET /api/content?type=&tag=&limit=
pub async fn list_content(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedResponse>> {
    let filter = FeedFilter::new(query.content_type.as_deref(), query.tag.as_deref());
    let limit = query.limit();
    let filtered = filter.content_type.is_some() || filter.tag.is_some();

    // Filters run in memory, so the store limit only applies to the unfiltered feed.
    let mut items: Vec<ContentCard> =
        published_cards(state.content.as_ref(), if filtered { None } else { limit })
            .await?
            .into_iter()
            .filter(|card| filter.matches(card))
            .collect();
    if let Some(limit) = limit {
        items.truncate(limit as usize);
    }

    Ok(Json(FeedResponse { items }))
}

/// GET /api/content/tags
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<TagsResponse>> {
    let cards = published_cards(state.content.as_ref(), None).await?;
    Ok(Json(TagsResponse {
        tags: available_tags(&cards),
    }))
}

/// GET /api/posts/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<PostDetail>> {
    let item = state
        .content
        .published_post_by_slug(slug.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    PostDetail::from_item(&item)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}
