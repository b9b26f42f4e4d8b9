use std::sync::Arc;

use crate::config::Settings;
use crate::repo::{ContentRepo, PortfolioRepo};
use crate::storage::ObjectStore;

/// Shared handles every handler receives through `State`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub content: Arc<dyn ContentRepo>,
    pub portfolio: Arc<dyn PortfolioRepo>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        content: Arc<dyn ContentRepo>,
        portfolio: Arc<dyn PortfolioRepo>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            content,
            portfolio,
            storage,
        }
    }
}
