//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::content::{AdminPostSummary, ContentItem, LinkedDraft, PostDraft};
use crate::portfolio::{
    PortfolioExperience, PortfolioProject, SectionKey, SectionRecord, SitePlan,
};

/// Postgres `undefined_table`, raised before migrations have been applied.
pub const PG_UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("relation does not exist yet")]
    MissingRelation,
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return RepoError::Duplicate {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
            if db_err.code().as_deref() == Some(PG_UNDEFINED_TABLE) {
                return RepoError::MissingRelation;
            }
        }
        RepoError::from_persistence(err)
    }
}

/// Reads tolerate a schema that has not been provisioned yet.
pub fn empty_if_missing<T: Default>(result: Result<T, RepoError>) -> Result<T, RepoError> {
    match result {
        Err(RepoError::MissingRelation) => {
            tracing::warn!("content tables are missing; treating as empty");
            Ok(T::default())
        }
        other => other,
    }
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Published items, newest first; posts only once they carry a slug.
    async fn published_items(&self, limit: Option<i64>) -> Result<Vec<ContentItem>, RepoError>;

    async fn published_post_by_slug(&self, slug: &str) -> Result<Option<ContentItem>, RepoError>;

    async fn admin_posts(&self) -> Result<Vec<AdminPostSummary>, RepoError>;

    async fn post_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError>;

    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError>;

    async fn insert_post(&self, draft: &PostDraft) -> Result<Uuid, RepoError>;

    /// Returns `false` when no post has that id.
    async fn update_post(&self, id: Uuid, draft: &PostDraft) -> Result<bool, RepoError>;

    async fn insert_linked(&self, draft: &LinkedDraft) -> Result<Uuid, RepoError>;

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PortfolioRepo: Send + Sync {
    async fn sections(&self) -> Result<Vec<SectionRecord>, RepoError>;

    async fn upsert_section(&self, key: SectionKey, content: &Value) -> Result<(), RepoError>;

    async fn projects(&self) -> Result<Vec<PortfolioProject>, RepoError>;

    async fn experiences(&self) -> Result<Vec<PortfolioExperience>, RepoError>;

    /// Apply every section replacement and row change, all or nothing.
    async fn apply_site_plan(&self, plan: &SitePlan) -> Result<(), RepoError>;
}
