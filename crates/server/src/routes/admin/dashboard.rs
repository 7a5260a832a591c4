//! Dashboard page and counters.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::{Stats, StatsRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub admin_name: String,
    pub stats: Stats,
}

/// Display the dashboard.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<AdminDashboardTemplate> {
    let stats = StatsRepository::new(state.pool()).get().await?;
    Ok(AdminDashboardTemplate {
        admin_name: admin.display_name,
        stats,
    })
}

/// Shop, review, user and unused invite counts.
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Stats>> {
    Ok(Json(StatsRepository::new(state.pool()).get().await?))
}
