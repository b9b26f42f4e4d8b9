pub mod content_store;
pub mod models;
pub mod portfolio_store;
pub mod unconfigured;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tokio::sync::OnceCell;

pub use content_store::PgContentStore;
pub use portfolio_store::PgPortfolioStore;
pub use unconfigured::UnconfiguredStore;

static DB_POOL: OnceCell<Arc<PgPool>> = OnceCell::const_new();

/// How to reach Postgres: a full URL, or the discrete `PG_*` settings.
#[derive(Clone)]
pub enum DbSource {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

impl std::fmt::Debug for DbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbSource::Url(_) => f.write_str("Url(<redacted>)"),
            DbSource::Parts {
                host, port, database, ..
            } => write!(f, "Parts({host}:{port}/{database})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub source: DbSource,
    pub schema: Schema,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// `None` when neither `DATABASE_URL` nor the full set of `PG_*` variables is present.
    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        let source = match get("DATABASE_URL") {
            Some(url) => DbSource::Url(url),
            None => DbSource::Parts {
                host: get("PG_HOST")?,
                port: get("PG_PORT")?.parse().ok()?,
                user: get("PG_USER")?,
                password: get("PG_PASSWORD")?,
                database: get("PG_DB")?,
            },
        };

        Some(Self {
            source,
            schema: Schema::new(get("PG_SCHEMA").as_deref().unwrap_or("public")),
            max_connections: get("DB_POOL_MAX")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: get("DB_POOL_MIN")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            idle_timeout_secs: get("DB_IDLE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        })
    }

    fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.source {
            DbSource::Url(url) => PgConnectOptions::from_str(url),
            DbSource::Parts {
                host,
                port,
                user,
                password,
                database,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database)),
        }
    }
}

/// Schema that qualifies every table name; identifiers are always quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema(String);

impl Schema {
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        Self(if name.is_empty() { "public" } else { name }.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn table(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.0), quote_ident(table))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new("public")
    }
}

pub fn quote_ident(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub async fn init_pool(config: &DbConfig) -> Result<Arc<PgPool>, sqlx::Error> {
    tracing::info!(source = ?config.source, schema = %config.schema.name(), "initializing database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect_with(config.connect_options()?)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("database connection pool initialized");

    let pool = Arc::new(pool);
    let _ = DB_POOL.set(pool.clone());

    Ok(pool)
}

pub fn get_pool() -> Option<Arc<PgPool>> {
    DB_POOL.get().cloned()
}

pub async fn health_check() -> Result<std::time::Duration, sqlx::Error> {
    let pool = get_pool()
        .ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await?;

    Ok(start.elapsed())
}

fn migration_statements(schema: &Schema) -> Vec<String> {
    let content = schema.table("content_items");
    let sections = schema.table("portfolio_sections");
    let projects = schema.table("portfolio_projects");
    let experiences = schema.table("portfolio_experiences");

    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema.name())),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {content} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                type TEXT NOT NULL CHECK (type IN ('post', 'external', 'bookmark')),
                status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
                title TEXT,
                slug TEXT,
                excerpt TEXT,
                tags TEXT[],
                content_md TEXT,
                cover_image_url TEXT,
                source_url TEXT,
                og_title TEXT,
                og_description TEXT,
                og_image_url TEXT,
                author_id UUID,
                published_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS content_items_post_slug_key \
             ON {content} (slug) WHERE type = 'post' AND slug IS NOT NULL"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS content_items_feed_idx \
             ON {content} (status, published_at DESC)"
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {sections} (
                section_key TEXT PRIMARY KEY,
                content_json JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {projects} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                excerpt TEXT,
                description TEXT,
                stack_tags TEXT[],
                thumbnail_url TEXT,
                links JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                pinned BOOLEAN NOT NULL DEFAULT false,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {experiences} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                org TEXT NOT NULL,
                role TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                bullets TEXT[],
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
    ]
}

pub async fn run_migrations(pool: &PgPool, schema: &Schema) -> Result<(), sqlx::Error> {
    tracing::info!(schema = %schema.name(), "running database migrations");

    for statement in migration_statements(schema) {
        sqlx::query(&statement).execute(pool).await?;
    }

    tracing::info!("database migrations completed");

    Ok(())
}
