//! Post and linked-content authoring flows.
//!
//! Each flow takes the submitted form, writes through the content repository
//! and returns the location the browser should be redirected to.

use serde::Deserialize;
use uuid::Uuid;

use super::form::sanitize_return_to;
use crate::content::shaping::{
    build_excerpt, extract_cover_image_url, parse_tags, strip_leading_title_heading,
};
use crate::content::slug::{resolve_unique_slug, slugify};
use crate::content::{ContentStatus, ContentType, LinkType, LinkedDraft, PostDraft};
use crate::repo::{ContentRepo, RepoError};

/// Attempts at claiming a slug before a duplicate error is surfaced.
const SLUG_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostForm {
    pub id: String,
    pub title: String,
    pub content_md: String,
    pub excerpt: String,
    pub tags: String,
    pub intent: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkForm {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub source_url: String,
    pub excerpt: String,
    pub tags: String,
    pub image_url: String,
    pub intent: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteForm {
    pub id: String,
    pub return_to: Option<String>,
}

/// Derived fields shared by create and update. `slug` is filled in later.
fn draft_from_form(form: &PostForm) -> PostDraft {
    let title = form.title.trim().to_string();
    let content_md = strip_leading_title_heading(&form.content_md, &title);

    let explicit = form.excerpt.trim();
    let excerpt = if !explicit.is_empty() {
        explicit.to_string()
    } else {
        let built = build_excerpt(&content_md);
        if built.is_empty() {
            title.clone()
        } else {
            built
        }
    };
    let cover = extract_cover_image_url(&content_md);

    PostDraft {
        slug: String::new(),
        excerpt,
        tags: parse_tags(&form.tags),
        cover_image_url: (!cover.is_empty()).then_some(cover),
        status: ContentStatus::from_intent(&form.intent),
        content_md,
        title,
    }
}

fn after_save(status: ContentStatus, slug: &str, return_to: String) -> String {
    match status {
        ContentStatus::Published => format!("/blog/{slug}"),
        ContentStatus::Draft => return_to,
    }
}

pub async fn create_post(repo: &dyn ContentRepo, form: &PostForm) -> Result<String, RepoError> {
    let return_to = sanitize_return_to(form.return_to.as_deref(), "/blog");
    let mut draft = draft_from_form(form);
    if draft.title.is_empty() {
        return Ok(return_to);
    }

    let base = slugify(&draft.title);
    let mut attempt = 1;
    loop {
        draft.slug = resolve_unique_slug(repo, &base, None).await?;
        match repo.insert_post(&draft).await {
            Ok(_) => break,
            Err(RepoError::Duplicate { constraint }) if attempt < SLUG_ATTEMPTS => {
                tracing::warn!(slug = %draft.slug, %constraint, attempt, "slug taken concurrently; retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(after_save(draft.status, &draft.slug, return_to))
}

pub async fn update_post(repo: &dyn ContentRepo, form: &PostForm) -> Result<String, RepoError> {
    let Ok(id) = Uuid::parse_str(form.id.trim()) else {
        return Ok("/blog".to_string());
    };
    let Some(existing) = repo.post_by_id(id).await? else {
        return Ok("/blog".to_string());
    };

    let fallback = match existing.post().and_then(|p| p.slug.as_deref()) {
        Some(slug) => format!("/blog/{slug}"),
        None => "/blog".to_string(),
    };
    let return_to = sanitize_return_to(form.return_to.as_deref(), &fallback);
    let mut draft = draft_from_form(form);
    if draft.title.is_empty() {
        return Ok(return_to);
    }

    let base = slugify(&draft.title);
    let mut attempt = 1;
    loop {
        draft.slug = resolve_unique_slug(repo, &base, Some(id)).await?;
        match repo.update_post(id, &draft).await {
            Ok(true) => break,
            Ok(false) => return Ok("/blog".to_string()),
            Err(RepoError::Duplicate { constraint }) if attempt < SLUG_ATTEMPTS => {
                tracing::warn!(post_id = %id, slug = %draft.slug, %constraint, attempt, "slug taken concurrently; retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(after_save(draft.status, &draft.slug, return_to))
}

pub async fn create_linked_content(
    repo: &dyn ContentRepo,
    form: &LinkForm,
) -> Result<String, RepoError> {
    let Ok(link_type) = form.kind.trim().parse::<LinkType>() else {
        return Ok("/blog".to_string());
    };
    let kind = ContentType::from(link_type);
    let return_to = sanitize_return_to(
        form.return_to.as_deref(),
        &format!("/blog/new/{}", kind.as_str()),
    );

    let title = form.title.trim();
    let source_url = form.source_url.trim();
    if title.is_empty() || source_url.is_empty() {
        return Ok(return_to);
    }

    let excerpt = form.excerpt.trim();
    let image_url = form.image_url.trim();
    let draft = LinkedDraft {
        link_type,
        status: ContentStatus::from_intent(&form.intent),
        title: title.to_string(),
        excerpt: (!excerpt.is_empty()).then(|| excerpt.to_string()),
        tags: parse_tags(&form.tags),
        source_url: source_url.to_string(),
        image_url: (!image_url.is_empty()).then(|| image_url.to_string()),
    };
    repo.insert_linked(&draft).await?;

    Ok("/blog".to_string())
}

pub async fn delete_content(repo: &dyn ContentRepo, form: &DeleteForm) -> Result<String, RepoError> {
    let return_to = sanitize_return_to(form.return_to.as_deref(), "/blog");
    let id = form.id.trim();
    if id.is_empty() {
        return Ok(return_to);
    }

    match Uuid::parse_str(id) {
        Ok(id) => {
            repo.delete_item(id).await?;
        }
        Err(_) => tracing::warn!(id, "ignoring delete of malformed content id"),
    }

    Ok(return_to)
}
