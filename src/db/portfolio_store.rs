//! Postgres-backed portfolio repository: sections, projects and experience rows.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::models::{
    non_empty, non_empty_list, PortfolioExperienceRow, PortfolioProjectRow, PortfolioSectionRow,
};
use super::Schema;
use crate::portfolio::{
    ExperienceInput, PortfolioChange, PortfolioExperience, PortfolioProject, ProjectInput,
    SectionKey, SectionRecord, SitePlan,
};
use crate::repo::{empty_if_missing, PortfolioRepo, RepoError};

#[derive(Clone)]
pub struct PgPortfolioStore {
    pool: Arc<PgPool>,
    sections: String,
    projects: String,
    experiences: String,
}

impl PgPortfolioStore {
    pub fn new(pool: Arc<PgPool>, schema: &Schema) -> Self {
        Self {
            pool,
            sections: schema.table("portfolio_sections"),
            projects: schema.table("portfolio_projects"),
            experiences: schema.table("portfolio_experiences"),
        }
    }

    // ========================================================================
    // Statements shared by single writes and the site plan transaction
    // ========================================================================

    async fn write_section(
        &self,
        conn: &mut PgConnection,
        key: SectionKey,
        content: &Value,
    ) -> Result<(), RepoError> {
        let sql = format!(
            r#"
            INSERT INTO {} (section_key, content_json, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (section_key)
            DO UPDATE SET content_json = EXCLUDED.content_json, updated_at = now()
            "#,
            self.sections
        );

        sqlx::query(&sql)
            .bind(key.as_str())
            .bind(content)
            .execute(conn)
            .await?;

        Ok(())
    }

    async fn write_project(
        &self,
        conn: &mut PgConnection,
        id: Option<Uuid>,
        input: &ProjectInput,
    ) -> Result<(), RepoError> {
        let sql = match id {
            Some(_) => format!(
                r#"
                UPDATE {}
                SET title = $2, excerpt = $3, description = $4, stack_tags = $5,
                    thumbnail_url = $6, links = $7, pinned = $8, sort_order = $9,
                    updated_at = now()
                WHERE id = $1
                "#,
                self.projects
            ),
            None => format!(
                r#"
                INSERT INTO {} (
                    id, title, excerpt, description, stack_tags, thumbnail_url, links,
                    pinned, sort_order, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
                "#,
                self.projects
            ),
        };

        sqlx::query(&sql)
            .bind(id.unwrap_or_else(Uuid::new_v4))
            .bind(input.title.trim())
            .bind(non_empty(&input.excerpt))
            .bind(non_empty(&input.description))
            .bind(non_empty_list(&input.stack_tags))
            .bind(non_empty(&input.thumbnail_url))
            .bind(input.links.to_json())
            .bind(input.pinned)
            .bind(input.sort_order)
            .execute(conn)
            .await?;

        Ok(())
    }

    async fn write_experience(
        &self,
        conn: &mut PgConnection,
        id: Option<Uuid>,
        input: &ExperienceInput,
    ) -> Result<(), RepoError> {
        let sql = match id {
            Some(_) => format!(
                r#"
                UPDATE {}
                SET org = $2, role = $3, start_date = $4, end_date = $5,
                    bullets = $6, sort_order = $7, updated_at = now()
                WHERE id = $1
                "#,
                self.experiences
            ),
            None => format!(
                r#"
                INSERT INTO {} (
                    id, org, role, start_date, end_date, bullets, sort_order, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
                "#,
                self.experiences
            ),
        };

        sqlx::query(&sql)
            .bind(id.unwrap_or_else(Uuid::new_v4))
            .bind(input.org.trim())
            .bind(input.role.trim())
            .bind(non_empty(&input.start_date))
            .bind(non_empty(&input.end_date))
            .bind(non_empty_list(&input.bullets))
            .bind(input.sort_order)
            .execute(conn)
            .await?;

        Ok(())
    }

    async fn delete_row(&self, conn: &mut PgConnection, table: &str, id: Uuid) -> Result<(), RepoError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        sqlx::query(&sql).bind(id).execute(conn).await?;
        Ok(())
    }

    async fn apply_change(
        &self,
        conn: &mut PgConnection,
        change: &PortfolioChange,
    ) -> Result<(), RepoError> {
        match change {
            PortfolioChange::DeleteProject(id) => self.delete_row(conn, &self.projects, *id).await,
            PortfolioChange::UpdateProject(id, input) => {
                self.write_project(conn, Some(*id), input).await
            }
            PortfolioChange::CreateProject(input) => self.write_project(conn, None, input).await,
            PortfolioChange::DeleteExperience(id) => {
                self.delete_row(conn, &self.experiences, *id).await
            }
            PortfolioChange::UpdateExperience(id, input) => {
                self.write_experience(conn, Some(*id), input).await
            }
            PortfolioChange::CreateExperience(input) => {
                self.write_experience(conn, None, input).await
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn fetch_sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        let sql = format!(
            "SELECT section_key, content_json, updated_at FROM {} ORDER BY section_key ASC",
            self.sections
        );
        let rows = sqlx::query_as::<_, PortfolioSectionRow>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.into_iter().map(SectionRecord::from).collect())
    }

    async fn fetch_projects(&self) -> Result<Vec<PortfolioProject>, RepoError> {
        let sql = format!(
            r#"
            SELECT id, title, excerpt, description, stack_tags, thumbnail_url, links,
                   pinned, sort_order, created_at, updated_at
            FROM {}
            ORDER BY pinned DESC NULLS LAST, sort_order ASC NULLS LAST, updated_at DESC NULLS LAST
            "#,
            self.projects
        );
        let rows = sqlx::query_as::<_, PortfolioProjectRow>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.into_iter().map(PortfolioProject::from).collect())
    }

    async fn fetch_experiences(&self) -> Result<Vec<PortfolioExperience>, RepoError> {
        let sql = format!(
            r#"
            SELECT id, org, role, start_date, end_date, bullets, sort_order, created_at, updated_at
            FROM {}
            ORDER BY sort_order ASC NULLS LAST, end_date DESC NULLS LAST, updated_at DESC NULLS LAST
            "#,
            self.experiences
        );
        let rows = sqlx::query_as::<_, PortfolioExperienceRow>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.into_iter().map(PortfolioExperience::from).collect())
    }
}

#[async_trait]
impl PortfolioRepo for PgPortfolioStore {
    async fn sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        empty_if_missing(self.fetch_sections().await)
    }

    async fn upsert_section(&self, key: SectionKey, content: &Value) -> Result<(), RepoError> {
        let mut conn = self.pool.acquire().await?;
        self.write_section(&mut conn, key, content).await?;
        tracing::info!(section = key.as_str(), "portfolio section saved");
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<PortfolioProject>, RepoError> {
        empty_if_missing(self.fetch_projects().await)
    }

    async fn experiences(&self) -> Result<Vec<PortfolioExperience>, RepoError> {
        empty_if_missing(self.fetch_experiences().await)
    }

    async fn apply_site_plan(&self, plan: &SitePlan) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        for (key, content) in &plan.sections {
            self.write_section(&mut tx, *key, content).await?;
        }
        for change in &plan.changes {
            self.apply_change(&mut tx, change).await?;
        }

        tx.commit().await?;

        tracing::info!(
            sections = plan.sections.len(),
            changes = plan.changes.len(),
            "portfolio site plan applied"
        );

        Ok(())
    }
}
