//! Admin session - a signed HS256 token carried in the `admin_session` cookie.

use axum::{extract::FromRequestParts, http::request::Parts, response::Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::AdminAuthSettings;
use crate::state::AppState;

pub const ADMIN_SESSION_COOKIE: &str = "admin_session";

/// 8 hours
pub const SESSION_TTL_SECONDS: i64 = 60 * 60 * 8;

pub const LOGIN_PATH: &str = "/admin/login";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

// ============================================================================
// Tokens
// ============================================================================

pub fn create_session_token(email: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: email.to_string(),
        email: Some(email.to_string()),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(SESSION_TTL_SECONDS)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Identity carried by a valid token: the `email` claim, else `sub`.
pub fn verify_session_token(token: &str, secret: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()?;

    data.claims
        .email
        .filter(|email| !email.is_empty())
        .or_else(|| Some(data.claims.sub).filter(|sub| !sub.is_empty()))
}

/// The signed-in admin, if the request carries a valid session cookie.
pub fn current_admin_identity(auth: &AdminAuthSettings, jar: &CookieJar) -> Option<String> {
    let secret = auth.session_secret.as_deref()?;
    let token = jar.get(ADMIN_SESSION_COOKIE)?;
    verify_session_token(token.value(), secret)
}

// ============================================================================
// Credentials
// ============================================================================

/// Compare submitted credentials with the configured admin account.
pub async fn check_credentials(auth: &AdminAuthSettings, email: &str, password: &str) -> bool {
    let Some(expected_email) = auth.email.as_deref() else {
        return false;
    };
    if email.trim() != expected_email {
        return false;
    }

    if let Some(hash) = auth.password_hash.clone() {
        let password = password.to_string();
        // bcrypt is CPU-bound
        return match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "admin password hash could not be verified");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        };
    }

    match auth.password.as_deref() {
        Some(expected) => expected.as_bytes().ct_eq(password.as_bytes()).into(),
        None => false,
    }
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ADMIN_SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL_SECONDS))
        .build()
}

/// Cookie used to clear the session; path must match the one it was set with.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(ADMIN_SESSION_COOKIE).path("/").build()
}

// ============================================================================
// Extractor
// ============================================================================

/// Guard for admin-only form actions. Without a valid session the request is
/// redirected to the login page.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match current_admin_identity(&state.settings.admin, &jar) {
            Some(email) => Ok(AdminSession { email }),
            None => {
                tracing::debug!(uri = %parts.uri, "admin session missing; redirecting to login");
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}
