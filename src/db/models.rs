//! Database Models - row structs for the CMS tables and their domain conversions.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::content::{
    AdminPostSummary, ContentBody, ContentItem, ContentStatus, ContentType, LinkPreview,
    LinkedSource, PostBody,
};
use crate::portfolio::{PortfolioExperience, PortfolioProject, ProjectLinks, SectionRecord};
use crate::repo::RepoError;

/// Column list matching [`ContentItemRow`].
pub const CONTENT_ITEM_COLUMNS: &str = "id, type, status, title, slug, excerpt, tags, content_md, \
     cover_image_url, source_url, og_title, og_description, og_image_url, published_at, updated_at";

/// One row of the polymorphic `content_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct ContentItemRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content_md: Option<String>,
    pub cover_image_url: Option<String>,
    pub source_url: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = RepoError;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        let kind: ContentType = row
            .kind
            .parse()
            .map_err(|e| RepoError::Corrupt(format!("content item {}: {e}", row.id)))?;
        let status: ContentStatus = row
            .status
            .parse()
            .map_err(|e| RepoError::Corrupt(format!("content item {}: {e}", row.id)))?;

        let linked = || LinkedSource {
            source_url: row.source_url.clone().unwrap_or_default(),
            preview: LinkPreview {
                title: row.og_title.clone(),
                description: row.og_description.clone(),
                image_url: row.og_image_url.clone(),
            },
        };
        let body = match kind {
            ContentType::Post => ContentBody::Post(PostBody {
                slug: row.slug.clone(),
                content_md: row.content_md.clone().unwrap_or_default(),
                cover_image_url: row.cover_image_url.clone(),
            }),
            ContentType::External => ContentBody::External(linked()),
            ContentType::Bookmark => ContentBody::Bookmark(linked()),
        };

        Ok(ContentItem {
            id: row.id,
            status,
            title: row.title,
            excerpt: row.excerpt,
            tags: row.tags.unwrap_or_default(),
            published_at: row.published_at,
            updated_at: row.updated_at,
            body,
        })
    }
}

/// Projection used by the admin post list.
#[derive(Debug, Clone, FromRow)]
pub struct AdminPostRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<AdminPostRow> for AdminPostSummary {
    type Error = RepoError;

    fn try_from(row: AdminPostRow) -> Result<Self, Self::Error> {
        Ok(AdminPostSummary {
            status: row
                .status
                .parse()
                .map_err(|e| RepoError::Corrupt(format!("post {}: {e}", row.id)))?,
            id: row.id,
            title: row.title,
            slug: row.slug,
            published_at: row.published_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PortfolioSectionRow {
    pub section_key: String,
    pub content_json: Value,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PortfolioSectionRow> for SectionRecord {
    fn from(row: PortfolioSectionRow) -> Self {
        SectionRecord {
            key: row.section_key,
            content: row.content_json,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PortfolioProjectRow {
    pub id: Uuid,
    pub title: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub stack_tags: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
    pub links: Option<Value>,
    pub pinned: Option<bool>,
    pub sort_order: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PortfolioProjectRow> for PortfolioProject {
    fn from(row: PortfolioProjectRow) -> Self {
        PortfolioProject {
            id: row.id,
            title: row.title,
            excerpt: row.excerpt,
            description: row.description,
            stack_tags: row.stack_tags.unwrap_or_default(),
            thumbnail_url: row.thumbnail_url,
            links: row
                .links
                .as_ref()
                .map(ProjectLinks::from_json)
                .unwrap_or_default(),
            pinned: row.pinned.unwrap_or(false),
            sort_order: row.sort_order.unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PortfolioExperienceRow {
    pub id: Uuid,
    pub org: String,
    pub role: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub bullets: Option<Vec<String>>,
    pub sort_order: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PortfolioExperienceRow> for PortfolioExperience {
    fn from(row: PortfolioExperienceRow) -> Self {
        PortfolioExperience {
            id: row.id,
            org: row.org,
            role: row.role,
            start_date: row.start_date,
            end_date: row.end_date,
            bullets: row.bullets.unwrap_or_default(),
            sort_order: row.sort_order.unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Converts fetched rows, dropping any that no longer map onto the domain.
///
/// Public and admin listings stay available when a single row carries an
/// unknown type or status; each dropped row is logged.
pub fn convert_rows<R, T>(rows: Vec<R>) -> Vec<T>
where
    T: TryFrom<R, Error = RepoError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable row");
                None
            }
        })
        .collect()
}

/// Empty strings are persisted as SQL null.
pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Empty lists are persisted as SQL null.
pub fn non_empty_list(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
