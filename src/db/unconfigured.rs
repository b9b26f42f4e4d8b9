//! Stand-in used when no database is configured: reads are empty and writes are dropped.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::content::{AdminPostSummary, ContentItem, LinkedDraft, PostDraft};
use crate::portfolio::{
    PortfolioExperience, PortfolioProject, SectionKey, SectionRecord, SitePlan,
};
use crate::repo::{ContentRepo, PortfolioRepo, RepoError};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStore;

#[async_trait]
impl ContentRepo for UnconfiguredStore {
    async fn published_items(&self, _limit: Option<i64>) -> Result<Vec<ContentItem>, RepoError> {
        Ok(Vec::new())
    }

    async fn published_post_by_slug(&self, _slug: &str) -> Result<Option<ContentItem>, RepoError> {
        Ok(None)
    }

    async fn admin_posts(&self) -> Result<Vec<AdminPostSummary>, RepoError> {
        Ok(Vec::new())
    }

    async fn post_by_id(&self, _id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        Ok(None)
    }

    async fn post_slug_taken(&self, _slug: &str, _exclude: Option<Uuid>) -> Result<bool, RepoError> {
        Ok(false)
    }

    async fn insert_post(&self, draft: &PostDraft) -> Result<Uuid, RepoError> {
        tracing::warn!(slug = %draft.slug, "database not configured; post not saved");
        Ok(Uuid::nil())
    }

    async fn update_post(&self, id: Uuid, _draft: &PostDraft) -> Result<bool, RepoError> {
        tracing::warn!(post_id = %id, "database not configured; post not updated");
        Ok(false)
    }

    async fn insert_linked(&self, _draft: &LinkedDraft) -> Result<Uuid, RepoError> {
        tracing::warn!("database not configured; linked content not saved");
        Ok(Uuid::nil())
    }

    async fn delete_item(&self, _id: Uuid) -> Result<bool, RepoError> {
        Ok(false)
    }
}

#[async_trait]
impl PortfolioRepo for UnconfiguredStore {
    async fn sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        Ok(Vec::new())
    }

    async fn upsert_section(&self, key: SectionKey, _content: &Value) -> Result<(), RepoError> {
        tracing::warn!(section = key.as_str(), "database not configured; section not saved");
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<PortfolioProject>, RepoError> {
        Ok(Vec::new())
    }

    async fn experiences(&self) -> Result<Vec<PortfolioExperience>, RepoError> {
        Ok(Vec::new())
    }

    async fn apply_site_plan(&self, _plan: &SitePlan) -> Result<(), RepoError> {
        tracing::warn!("database not configured; site changes not saved");
        Ok(())
    }
}
