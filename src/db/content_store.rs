//! Postgres-backed content repository over the polymorphic `content_items` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    convert_rows, non_empty, non_empty_list, AdminPostRow, ContentItemRow, CONTENT_ITEM_COLUMNS,
};
use super::Schema;
use crate::content::{
    AdminPostSummary, ContentItem, ContentStatus, ContentType, LinkedDraft, PostDraft,
};
use crate::repo::{empty_if_missing, ContentRepo, RepoError};

#[derive(Clone)]
pub struct PgContentStore {
    pool: Arc<PgPool>,
    table: String,
}

impl PgContentStore {
    pub fn new(pool: Arc<PgPool>, schema: &Schema) -> Self {
        Self {
            pool,
            table: schema.table("content_items"),
        }
    }

    async fn fetch_published(&self, limit: Option<i64>) -> Result<Vec<ContentItem>, RepoError> {
        let limit_sql = if limit.is_some() { " LIMIT $1" } else { "" };
        let sql = format!(
            r#"
            SELECT {CONTENT_ITEM_COLUMNS}
            FROM {}
            WHERE status = 'published'
              AND (type <> 'post' OR slug IS NOT NULL)
            ORDER BY published_at DESC NULLS LAST{limit_sql}
            "#,
            self.table
        );

        let mut query = sqlx::query_as::<_, ContentItemRow>(&sql);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }
        let rows = query.fetch_all(self.pool.as_ref()).await?;

        Ok(convert_rows(rows))
    }

    async fn fetch_post_by_slug(&self, slug: &str) -> Result<Option<ContentItem>, RepoError> {
        let sql = format!(
            r#"
            SELECT {CONTENT_ITEM_COLUMNS}
            FROM {}
            WHERE type = 'post' AND status = 'published' AND slug = $1
            LIMIT 1
            "#,
            self.table
        );

        let row = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.and_then(|row| convert_rows(vec![row]).pop()))
    }

    async fn fetch_admin_posts(&self) -> Result<Vec<AdminPostSummary>, RepoError> {
        let sql = format!(
            r#"
            SELECT id, title, slug, status, published_at, updated_at
            FROM {}
            WHERE type = 'post'
            ORDER BY updated_at DESC NULLS LAST
            "#,
            self.table
        );

        let rows = sqlx::query_as::<_, AdminPostRow>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(convert_rows(rows))
    }
}

#[async_trait]
impl ContentRepo for PgContentStore {
    async fn published_items(&self, limit: Option<i64>) -> Result<Vec<ContentItem>, RepoError> {
        let limit = limit.filter(|l| *l > 0);
        empty_if_missing(self.fetch_published(limit).await)
    }

    async fn published_post_by_slug(&self, slug: &str) -> Result<Option<ContentItem>, RepoError> {
        empty_if_missing(self.fetch_post_by_slug(slug).await)
    }

    async fn admin_posts(&self) -> Result<Vec<AdminPostSummary>, RepoError> {
        empty_if_missing(self.fetch_admin_posts().await)
    }

    async fn post_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        let sql = format!(
            "SELECT {CONTENT_ITEM_COLUMNS} FROM {} WHERE id = $1 AND type = 'post' LIMIT 1",
            self.table
        );

        let row = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await;

        empty_if_missing(row.map_err(RepoError::from))?
            .map(ContentItem::try_from)
            .transpose()
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM {}
                WHERE type = 'post' AND slug = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
            self.table
        );

        let (taken,): (bool,) = sqlx::query_as(&sql)
            .bind(slug)
            .bind(exclude)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(taken)
    }

    async fn insert_post(&self, draft: &PostDraft) -> Result<Uuid, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                type, status, title, slug, excerpt, tags, content_md, cover_image_url,
                published_at, created_at, updated_at
            )
            VALUES (
                'post', $1, $2, $3, $4, $5, $6, $7,
                CASE WHEN $1 = 'published' THEN now() ELSE NULL END, now(), now()
            )
            RETURNING id
            "#,
            self.table
        );

        let (id,): (Uuid,) = sqlx::query_as(&sql)
            .bind(draft.status.as_str())
            .bind(&draft.title)
            .bind(&draft.slug)
            .bind(non_empty(&draft.excerpt))
            .bind(non_empty_list(&draft.tags))
            .bind(&draft.content_md)
            .bind(draft.cover_image_url.as_deref().and_then(non_empty))
            .fetch_one(self.pool.as_ref())
            .await?;

        tracing::info!(post_id = %id, slug = %draft.slug, status = draft.status.as_str(), "post created");

        Ok(id)
    }

    async fn update_post(&self, id: Uuid, draft: &PostDraft) -> Result<bool, RepoError> {
        let sql = format!(
            r#"
            UPDATE {}
            SET
                status = $2,
                title = $3,
                slug = $4,
                excerpt = $5,
                tags = $6,
                content_md = $7,
                cover_image_url = $8,
                published_at = CASE
                    WHEN $2 = 'published' AND published_at IS NULL THEN now()
                    WHEN $2 = 'draft' THEN NULL
                    ELSE published_at
                END,
                updated_at = now()
            WHERE id = $1 AND type = 'post'
            "#,
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(draft.status.as_str())
            .bind(&draft.title)
            .bind(&draft.slug)
            .bind(non_empty(&draft.excerpt))
            .bind(non_empty_list(&draft.tags))
            .bind(&draft.content_md)
            .bind(draft.cover_image_url.as_deref().and_then(non_empty))
            .execute(self.pool.as_ref())
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            tracing::info!(post_id = %id, slug = %draft.slug, status = draft.status.as_str(), "post updated");
        }

        Ok(updated)
    }

    async fn insert_linked(&self, draft: &LinkedDraft) -> Result<Uuid, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                type, status, title, excerpt, tags, source_url,
                og_title, og_description, og_image_url, published_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $3, $4, $7, $8, now(), now())
            RETURNING id
            "#,
            self.table
        );

        let published_at = (draft.status == ContentStatus::Published).then(chrono::Utc::now);
        let kind = ContentType::from(draft.link_type);

        let (id,): (Uuid,) = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .bind(draft.status.as_str())
            .bind(&draft.title)
            .bind(draft.excerpt.as_deref().and_then(non_empty))
            .bind(non_empty_list(&draft.tags))
            .bind(&draft.source_url)
            .bind(draft.image_url.as_deref().and_then(non_empty))
            .bind(published_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        tracing::info!(item_id = %id, kind = kind.as_str(), "linked content created");

        Ok(id)
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        tracing::info!(item_id = %id, deleted = result.rows_affected(), "content item delete");

        Ok(result.rows_affected() > 0)
    }
}
