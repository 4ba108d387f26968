//! services/api/src/web/leaderboard.rs

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use dormduty_core::{
    domain::{Identity, LeaderboardEntry, LeaderboardPage},
    membership::resolve_room,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    response::{ErrorBody, HttpError},
    state::AppState,
};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    pub room_id: Option<Uuid>,
    /// Page size, 1 to 100. Defaults to 10.
    pub limit: Option<u32>,
    /// 1-based page number. Defaults to 1.
    pub page: Option<u32>,
}

/// Room members ranked by aura.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "One page of the ranking", body = LeaderboardPage),
        (status = 400, description = "Invalid paging", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardPage>, HttpError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(HttpError::bad_request(format!("limit must be between 1 and {}", MAX_LIMIT)));
    }
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(HttpError::bad_request("page starts at 1"));
    }

    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;

    let offset = u64::from(page - 1) * u64::from(limit);
    let (users, total) = state.db.leaderboard(room_id, limit, offset).await?;
    let entries = users
        .into_iter()
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: offset + i as u64 + 1,
            user_id: user.id,
            name: user.name,
            aura: user.aura,
        })
        .collect();

    Ok(Json(LeaderboardPage {
        entries,
        page,
        limit,
        total,
    }))
}
