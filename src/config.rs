//! Settings - environment-driven configuration for the CMS backend.
//!
//! Every value is read once at start-up. Missing database or storage settings
//! are not errors: the service runs with those features switched off.

use std::path::PathBuf;

use crate::db::DbConfig;

/// Admin credentials and the session signing secret.
#[derive(Debug, Clone, Default)]
pub struct AdminAuthSettings {
    pub email: Option<String>,
    pub password: Option<String>,
    /// bcrypt hash, takes precedence over `password` when both are set
    pub password_hash: Option<String>,
    pub session_secret: Option<String>,
}

impl AdminAuthSettings {
    /// Sign-in is only possible once email, a password and the secret are present.
    pub fn is_configured(&self) -> bool {
        self.email.is_some()
            && (self.password.is_some() || self.password_hash.is_some())
            && self.session_secret.is_some()
    }

    fn is_partially_configured(&self) -> bool {
        !self.is_configured()
            && (self.email.is_some()
                || self.password.is_some()
                || self.password_hash.is_some()
                || self.session_secret.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database: Option<DbConfig>,
    pub admin: AdminAuthSettings,
    pub uploads: UploadSettings,
    pub site: SiteSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("admin auth is partially configured; set ADMIN_EMAIL, ADMIN_PASSWORD or ADMIN_PASSWORD_HASH, and ADMIN_SESSION_SECRET")]
    PartialAdminAuth,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: get("PORT").and_then(|s| s.parse().ok()).unwrap_or(3001),
            database: DbConfig::from_lookup(&get),
            admin: AdminAuthSettings {
                email: get("ADMIN_EMAIL"),
                password: get("ADMIN_PASSWORD"),
                password_hash: get("ADMIN_PASSWORD_HASH"),
                session_secret: get("ADMIN_SESSION_SECRET"),
            },
            uploads: UploadSettings {
                dir: PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
                public_base_url: get("OBJECT_PUBLIC_BASE_URL")
                    .map(|base| base.trim_end_matches('/').to_string()),
            },
            site: SiteSettings {
                url: get("SITE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "http://localhost:3001".to_string()),
                title: get("SITE_TITLE").unwrap_or_else(|| "Portfolio Blog".to_string()),
                description: get("SITE_DESCRIPTION")
                    .unwrap_or_else(|| "Posts, external essays, and saved references".to_string()),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse configurations that would leave the admin locked out in production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production() && self.admin.is_partially_configured() {
            return Err(ConfigError::PartialAdminAuth);
        }
        Ok(())
    }
}
