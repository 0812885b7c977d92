//! `GET /api/flags` (§6): paginated read of the Flag Store.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use flagfarm_protocol::Flag;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    start: i64,
    #[serde(default = "default_count")]
    count: i64,
}

fn default_count() -> i64 {
    50
}

pub async fn list_flags_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Flag>>, AppError> {
    if query.count > 100 {
        return Err(AppError::ClientMalformed("count must be <= 100".into()));
    }
    let now = chrono::Utc::now().timestamp();
    let page = state.flags.page(query.start, query.count, now).await?;
    Ok(Json(page))
}
