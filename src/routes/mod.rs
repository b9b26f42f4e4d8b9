/**
 * Routes Module
 * HTTP handlers for the public read API, admin actions and uploads
 */

pub mod admin;
pub mod auth;
pub mod content;
pub mod health;
pub mod portfolio;
pub mod rss;
pub mod upload;

use serde::{Deserialize, Serialize};

/// JSON error body shared by every handler.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
