//! Content items - posts, external links and bookmarks sharing one feed.

pub mod shaping;
pub mod slug;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
        }
    }

    /// Editor forms submit `intent=publish` for the publish button; anything else saves a draft.
    pub fn from_intent(intent: &str) -> Self {
        if intent.trim() == "publish" {
            ContentStatus::Published
        } else {
            ContentStatus::Draft
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    External,
    Bookmark,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::External => "external",
            ContentType::Bookmark => "bookmark",
        }
    }
}

/// The two content types defined by a source URL instead of an owned body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    External,
    Bookmark,
}

impl From<LinkType> for ContentType {
    fn from(value: LinkType) -> Self {
        match value {
            LinkType::External => ContentType::External,
            LinkType::Bookmark => ContentType::Bookmark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for ContentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ContentStatus::Draft),
            "published" => Ok(ContentStatus::Published),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for ContentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentType::Post),
            "external" => Ok(ContentType::External),
            "bookmark" => Ok(ContentType::Bookmark),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for LinkType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(LinkType::External),
            "bookmark" => Ok(LinkType::Bookmark),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PostBody {
    pub slug: Option<String>,
    pub content_md: String,
    pub cover_image_url: Option<String>,
}

/// Preview fields shown for a linked item in place of owned content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPreview {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedSource {
    pub source_url: String,
    pub preview: LinkPreview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBody {
    Post(PostBody),
    External(LinkedSource),
    Bookmark(LinkedSource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    pub status: ContentStatus,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub body: ContentBody,
}

impl ContentItem {
    pub fn content_type(&self) -> ContentType {
        match self.body {
            ContentBody::Post(_) => ContentType::Post,
            ContentBody::External(_) => ContentType::External,
            ContentBody::Bookmark(_) => ContentType::Bookmark,
        }
    }

    pub fn post(&self) -> Option<&PostBody> {
        match &self.body {
            ContentBody::Post(post) => Some(post),
            _ => None,
        }
    }

    fn linked(&self) -> Option<&LinkedSource> {
        match &self.body {
            ContentBody::External(link) | ContentBody::Bookmark(link) => Some(link),
            ContentBody::Post(_) => None,
        }
    }

    /// A post has its own page only once it is published and slugged.
    pub fn is_publicly_addressable(&self) -> bool {
        match &self.body {
            ContentBody::Post(post) => {
                self.status == ContentStatus::Published && post.slug.is_some()
            }
            _ => self.status == ContentStatus::Published,
        }
    }

    /// Where a feed card points: the post page, the listing, or the external source.
    pub fn href(&self) -> String {
        match &self.body {
            ContentBody::Post(PostBody { slug: Some(slug), .. })
                if self.status == ContentStatus::Published =>
            {
                format!("/blog/{slug}")
            }
            ContentBody::Post(_) => "/blog".to_string(),
            ContentBody::External(link) | ContentBody::Bookmark(link) => {
                if link.source_url.is_empty() {
                    "#".to_string()
                } else {
                    link.source_url.clone()
                }
            }
        }
    }
}

/// Fields written when a post is created or edited.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub content_md: String,
    pub cover_image_url: Option<String>,
    pub status: ContentStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedDraft {
    pub link_type: LinkType,
    pub status: ContentStatus,
    pub title: String,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub source_url: String,
    pub image_url: Option<String>,
}

/// Row of the admin post list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: ContentStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Public views
// ============================================================================

/// Display form of a published timestamp, e.g. `Jan 05, 2025`.
pub fn format_card_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_default()
}

/// One entry of the unified public feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCard {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub date: String,
    pub href: String,
    pub external: bool,
    pub image_url: Option<String>,
}

impl From<&ContentItem> for ContentCard {
    fn from(item: &ContentItem) -> Self {
        let preview = item.linked().map(|link| &link.preview);
        let title = item
            .title
            .clone()
            .or_else(|| preview.and_then(|p| p.title.clone()))
            .unwrap_or_else(|| "Untitled".to_string());
        let excerpt = item
            .excerpt
            .clone()
            .or_else(|| preview.and_then(|p| p.description.clone()))
            .unwrap_or_default();
        let image_url = item
            .post()
            .and_then(|post| post.cover_image_url.clone())
            .or_else(|| preview.and_then(|p| p.image_url.clone()));

        Self {
            id: item.id,
            content_type: item.content_type(),
            title,
            excerpt,
            tags: item.tags.clone(),
            date: format_card_date(item.published_at),
            href: item.href(),
            external: item.content_type() != ContentType::Post,
            image_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub content_md: String,
    pub cover_image_url: Option<String>,
    pub published_at: String,
}

impl PostDetail {
    pub fn from_item(item: &ContentItem) -> Option<Self> {
        let post = item.post()?;
        Some(Self {
            id: item.id,
            title: item.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            excerpt: item.excerpt.clone().unwrap_or_default(),
            tags: item.tags.clone(),
            content_md: post.content_md.clone(),
            cover_image_url: post.cover_image_url.clone(),
            published_at: format_card_date(item.published_at),
        })
    }
}

/// Feed narrowing by content type and tag.
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub content_type: Option<ContentType>,
    pub tag: Option<String>,
}

impl FeedFilter {
    /// Unknown type names and blank tags mean "no filter".
    pub fn new(content_type: Option<&str>, tag: Option<&str>) -> Self {
        Self {
            content_type: content_type.and_then(|t| t.trim().parse().ok()),
            tag: tag
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn matches(&self, card: &ContentCard) -> bool {
        let type_ok = self.content_type.is_none_or(|t| card.content_type == t);
        let tag_ok = self.tag.as_ref().is_none_or(|wanted| {
            card.tags
                .iter()
                .any(|tag| tag.trim().to_lowercase() == *wanted)
        });
        type_ok && tag_ok
    }
}

/// Sorted, de-duplicated tags across a set of cards.
pub fn available_tags(cards: &[ContentCard]) -> Vec<String> {
    let mut tags: Vec<String> = cards
        .iter()
        .flat_map(|card| card.tags.iter().map(|t| t.trim().to_lowercase()))
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}
