use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::AuthUser, repo_types::PublicUser},
    error::{parse_id, AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).delete(delete_user))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<Vec<PublicUser>>> {
    let users = state.users.list_public().await?;
    Ok(Json(users))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id, "Invalid user ID")?;
    let user = state
        .users
        .find_public(id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(Json(user))
}

/// Accounts can only be deleted by their owner.
#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    let id = parse_id(&id, "Invalid user ID")?;
    if caller.id != id {
        warn!(caller = %caller.id, target = %id, "delete of foreign account refused");
        return Err(AppError::Forbidden("You can only delete your own account"));
    }
    if !state.users.delete(id).await? {
        return Err(AppError::NotFound("User not found"));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(DeletedResponse {
        message: "User deleted successfully",
    }))
}
