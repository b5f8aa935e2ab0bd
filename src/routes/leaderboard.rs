use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    AppState,
};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CategoryLeaderboardQuery {
    pub category_id: Option<Uuid>,
}

#[axum::debug_handler]
pub async fn leaderboard(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let entries = state.leaderboard_service.top().await?;
    Ok(Json(entries))
}

#[axum::debug_handler]
pub async fn leaderboard_by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryLeaderboardQuery>,
) -> Result<impl IntoResponse> {
    let category_id = query
        .category_id
        .ok_or_else(|| Error::BadRequest("category_id parameter required".to_string()))?;
    let entries = state.leaderboard_service.top_by_category(category_id).await?;
    Ok(Json(entries))
}
