use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::SendQuestionRequest,
    repo_types::{NewQuestion, Question, QuestionStatus},
};
use crate::{
    auth::repo_types::PublicUser,
    error::{parse_id, AppError, AppResult},
    state::AppState,
};

pub const MAX_QUESTION_LEN: usize = 1000;
pub const MAX_ANSWER_LEN: usize = 2000;
pub const FEED_LIMIT: i64 = 50;

/// Trims `raw` and checks it holds between 1 and `max` characters.
fn bounded_text(raw: Option<String>, field: &str, max: usize) -> AppResult<String> {
    let text = raw.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} is required")));
    }
    if text.chars().count() > max {
        return Err(AppError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

#[instrument(skip(state))]
pub async fn received(state: &AppState, user_id: Uuid) -> AppResult<Vec<Question>> {
    Ok(state.questions.list_received(user_id).await?)
}

#[instrument(skip(state))]
pub async fn asked(state: &AppState, user_id: Uuid) -> AppResult<Vec<Question>> {
    Ok(state.questions.list_asked(user_id).await?)
}

#[instrument(skip(state))]
pub async fn feed(state: &AppState) -> AppResult<Vec<Question>> {
    Ok(state.questions.feed(FEED_LIMIT).await?)
}

#[instrument(skip(state, sender, req), fields(sender = %sender.id))]
pub async fn send(
    state: &AppState,
    sender: &PublicUser,
    req: SendQuestionRequest,
) -> AppResult<Question> {
    let to_user = req
        .to_user_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("toUserId is required".into()))?;
    let to_user = parse_id(to_user, "Invalid user ID")?;
    let question = bounded_text(req.question, "Question", MAX_QUESTION_LEN)?;
    let is_anonymous = req.is_anonymous.unwrap_or(false);

    if state.users.find_public(to_user).await?.is_none() {
        warn!(%to_user, "question to unknown user");
        return Err(AppError::NotFound("User not found"));
    }

    let created = state
        .questions
        .create(NewQuestion {
            from_user: (!is_anonymous).then_some(sender.id),
            to_user,
            question,
            is_anonymous,
        })
        .await?;
    info!(question_id = %created.id, %to_user, is_anonymous, "question sent");
    Ok(created)
}

/// Loads a question and checks `caller` is its recipient.
async fn owned_question(
    state: &AppState,
    caller: &PublicUser,
    question_id: &str,
    refusal: &'static str,
) -> AppResult<Question> {
    let id = parse_id(question_id, "Invalid question ID")?;
    let question = state
        .questions
        .find(id)
        .await?
        .ok_or(AppError::NotFound("Question not found"))?;
    if question.to_user.id != caller.id {
        warn!(question_id = %id, caller = %caller.id, "question belongs to another user");
        return Err(AppError::Forbidden(refusal));
    }
    Ok(question)
}

#[instrument(skip(state, caller, answer), fields(caller = %caller.id))]
pub async fn answer(
    state: &AppState,
    caller: &PublicUser,
    question_id: &str,
    answer: Option<String>,
) -> AppResult<Question> {
    let question = owned_question(
        state,
        caller,
        question_id,
        "You can only answer questions sent to you",
    )
    .await?;
    let answer = bounded_text(answer, "Answer", MAX_ANSWER_LEN)?;

    let answered = state
        .questions
        .answer(question.id, &answer, OffsetDateTime::now_utc())
        .await?
        .ok_or(AppError::NotFound("Question not found"))?;
    info!(question_id = %answered.id, "question answered");
    Ok(answered)
}

#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn ignore(state: &AppState, caller: &PublicUser, question_id: &str) -> AppResult<()> {
    let question = owned_question(
        state,
        caller,
        question_id,
        "You can only ignore questions sent to you",
    )
    .await?;
    if !state
        .questions
        .set_status(question.id, QuestionStatus::Ignored)
        .await?
    {
        return Err(AppError::NotFound("Question not found"));
    }
    info!(question_id = %question.id, "question ignored");
    Ok(())
}
