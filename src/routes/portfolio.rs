/**
 * Portfolio Routes
 * Public view of the portfolio sections, projects and experience
 */
use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::portfolio::PortfolioView;
use crate::repo::PortfolioRepo;
use crate::state::AppState;

/// GET /api/portfolio
pub async fn get_portfolio(State(state): State<AppState>) -> AppResult<Json<PortfolioView>> {
    let repo = state.portfolio.as_ref();
    let (sections, projects, experiences) =
        tokio::try_join!(repo.sections(), repo.projects(), repo.experiences())?;

    Ok(Json(PortfolioView::build(&sections, &projects, &experiences)))
}
