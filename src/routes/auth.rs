/**
 * Authentication Routes
 * Cookie-based admin sign-in and sign-out
 */
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::routes::ErrorResponse;
use crate::session::{check_credentials, create_session_token, removal_cookie, session_cookie};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = &state.settings.admin;

    let (Some(email), Some(secret)) = (auth.email.as_deref(), auth.session_secret.as_deref()) else {
        tracing::warn!("sign-in attempted while admin auth is not configured");
        return Redirect::to("/admin/login?error=config").into_response();
    };
    if !auth.is_configured() {
        tracing::warn!("sign-in attempted while admin auth is not configured");
        return Redirect::to("/admin/login?error=config").into_response();
    }

    if !check_credentials(auth, &form.email, &form.password).await {
        tracing::warn!(email = %form.email.trim(), "admin sign-in rejected");
        return Redirect::to("/admin/login?error=invalid").into_response();
    }

    match create_session_token(email, secret) {
        Ok(token) => {
            tracing::info!(email = %email, "admin signed in");
            let cookie = session_cookie(token, state.settings.is_production());
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to sign session token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

/// POST /admin/logout, POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    tracing::info!("admin signed out");
    (jar.remove(removal_cookie()), Redirect::to("/"))
}
