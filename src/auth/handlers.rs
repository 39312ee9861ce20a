use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, MessageResponse, ProfileResponse, RefreshRequest, RefreshResponse,
            SigninRequest, SignupRequest,
        },
        extractors::AuthUser,
        services::{self, AuthSession},
    },
    error::AppResult,
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

fn auth_response(message: &'static str, session: AuthSession) -> AuthResponse {
    AuthResponse {
        message,
        user: session.user,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = services::signup(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(auth_response("User created successfully", session)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SigninRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = services::signin(&state, payload).await?;
    Ok(Json(auth_response("Login successful", session)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Option<Json<RefreshRequest>>,
) -> AppResult<Json<RefreshResponse>> {
    let token = payload.and_then(|Json(body)| body.refresh_token);
    let access_token = services::refresh(&state, token).await?;
    Ok(Json(RefreshResponse {
        message: "Token refreshed successfully",
        access_token,
    }))
}

/// Tolerates a missing identity or body; only storage failures surface.
#[instrument(skip(state, auth, payload))]
pub async fn logout(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    payload: Option<Json<RefreshRequest>>,
) -> AppResult<Json<MessageResponse>> {
    let user_id = auth.map(|AuthUser(user)| user.id);
    let token = payload.and_then(|Json(body)| body.refresh_token);
    services::logout(&state, user_id, token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

#[instrument(skip(state, user))]
pub async fn logout_all(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MessageResponse>> {
    services::logout_all(&state, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Logged out from all devices successfully",
    }))
}

#[instrument(skip(user))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse { user })
}
