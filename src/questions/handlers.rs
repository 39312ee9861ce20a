use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{parse_id, AppResult},
    extract::JsonBody,
    questions::{
        dto::{
            AnswerRequest, QuestionListResponse, QuestionResponse, SendQuestionRequest,
            StatusResponse,
        },
        services,
    },
    state::AppState,
};

pub fn questions_routes() -> Router<AppState> {
    Router::new()
        .route("/questions/user/:user_id", get(received))
        .route("/questions/asked/:user_id", get(asked))
        .route("/questions/send", post(send))
        .route("/questions/feed", get(feed))
        .route("/questions/:question_id/answer", post(answer))
        .route("/questions/:question_id/ignore", post(ignore))
}

#[instrument(skip(state))]
pub async fn received(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<QuestionListResponse>> {
    let user_id = parse_id(&user_id, "Invalid user ID")?;
    let questions = services::received(&state, user_id).await?;
    Ok(Json(questions.into()))
}

#[instrument(skip(state))]
pub async fn asked(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<QuestionListResponse>> {
    let user_id = parse_id(&user_id, "Invalid user ID")?;
    let questions = services::asked(&state, user_id).await?;
    Ok(Json(questions.into()))
}

#[instrument(skip(state))]
pub async fn feed(State(state): State<AppState>) -> AppResult<Json<QuestionListResponse>> {
    let questions = services::feed(&state).await?;
    Ok(Json(questions.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn send(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(payload): JsonBody<SendQuestionRequest>,
) -> AppResult<(StatusCode, Json<QuestionResponse>)> {
    let question = services::send(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(QuestionResponse {
            success: true,
            message: "Question sent successfully",
            question,
        }),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(question_id): Path<String>,
    payload: Option<Json<AnswerRequest>>,
) -> AppResult<Json<QuestionResponse>> {
    let text = payload.and_then(|Json(body)| body.answer);
    let question = services::answer(&state, &user, &question_id, text).await?;
    Ok(Json(QuestionResponse {
        success: true,
        message: "Question answered successfully",
        question,
    }))
}

#[instrument(skip(state, user))]
pub async fn ignore(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(question_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    services::ignore(&state, &user, &question_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Question ignored successfully",
    }))
}
