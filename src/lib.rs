//! Portfolio CMS - library for app logic and testing

pub mod authoring;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod portfolio;
pub mod repo;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::{ConfigError, Settings};
use crate::db::{PgContentStore, PgPortfolioStore, UnconfiguredStore};
use crate::repo::{ContentRepo, PortfolioRepo};
use crate::state::AppState;
use crate::storage::LocalObjectStore;

/// Global request body cap; uploads are the largest bodies.
const BODY_LIMIT_BYTES: usize = 12 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid bind address `{0}`")]
    Address(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        // Public reads
        .route("/api/content", get(routes::content::list_content))
        .route("/api/content/tags", get(routes::content::list_tags))
        .route("/api/posts/{slug}", get(routes::content::get_post))
        .route("/api/portfolio", get(routes::portfolio::get_portfolio))
        .route("/rss.xml", get(routes::rss::rss_feed))
        // Uploads
        .route(
            "/api/uploads/image",
            post(routes::upload::upload_image)
                .layer(DefaultBodyLimit::max(routes::upload::UPLOAD_BODY_LIMIT)),
        )
        .route("/api/uploads/{*key}", get(routes::upload::serve_upload))
        // Session
        .route("/admin/login", post(routes::auth::login))
        .route("/admin/logout", post(routes::auth::logout))
        .route("/api/auth/logout", post(routes::auth::logout))
        // Admin actions
        .route(
            "/admin/posts",
            get(routes::admin::list_posts).post(routes::admin::create_post),
        )
        .route("/admin/posts/update", post(routes::admin::update_post))
        .route("/admin/posts/{id}", get(routes::admin::get_post))
        .route("/admin/linked", post(routes::admin::create_linked_content))
        .route("/admin/content/delete", post(routes::admin::delete_content))
        .route("/admin/site", post(routes::admin::save_site))
        .route("/admin/hero", post(routes::admin::update_hero))
        .route("/admin/about", post(routes::admin::update_about))
        // Health
        .route("/health", get(routes::health::health_ping))
        .route("/api/health", get(routes::health::health))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors)
}

/// Repositories and object store behind the handlers.
///
/// Without database settings the repositories are the unconfigured store:
/// reads come back empty and writes are ignored.
pub async fn build_state(settings: Settings) -> Result<AppState, StartupError> {
    let (content, portfolio): (Arc<dyn ContentRepo>, Arc<dyn PortfolioRepo>) =
        match &settings.database {
            Some(config) => {
                let pool = db::init_pool(config).await?;
                db::run_migrations(&pool, &config.schema).await?;
                (
                    Arc::new(PgContentStore::new(pool.clone(), &config.schema)),
                    Arc::new(PgPortfolioStore::new(pool, &config.schema)),
                )
            }
            None => {
                tracing::warn!("database is not configured; content reads are empty and writes are ignored");
                (Arc::new(UnconfiguredStore), Arc::new(UnconfiguredStore))
            }
        };

    tracing::info!(dir = %settings.uploads.dir.display(), "using local object store");
    let storage = Arc::new(LocalObjectStore::new(settings.uploads.dir.clone()));

    Ok(AppState::new(settings, content, portfolio, storage))
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init(&settings.environment);

    routes::health::init_start_time();

    settings.validate()?;
    if !settings.admin.is_configured() {
        tracing::warn!("admin auth is not configured; sign-in is disabled");
    }

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|_| StartupError::Address(format!("{}:{}", settings.host, settings.port)))?;

    let app = create_app(build_state(settings).await?);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin_cookie, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn app_assigns_request_ids() {
        let app = create_app(test_app().state);
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn admin_actions_redirect_without_session() {
        let app = create_app(test_app().state);
        let req = Request::post("/admin/site")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("title=Hi"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/admin/login");
    }

    #[tokio::test]
    async fn upload_route_and_object_route_coexist() {
        let test = test_app();
        let app = create_app(test.state.clone());
        let req = Request::get("/api/uploads/blog/2025/01/01/missing.png")
            .header(header::COOKIE, admin_cookie())
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unconfigured_state_serves_empty_feed() {
        let settings = crate::test_support::test_settings(&[("UPLOAD_DIR", "target/test-uploads")]);
        let state = build_state(settings).await.unwrap();
        let app = create_app(state);
        let res = app
            .oneshot(Request::get("/api/content").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["items"], serde_json::json!([]));
    }
}
