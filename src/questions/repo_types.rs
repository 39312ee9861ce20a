use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Answered,
    Ignored,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Pending => "pending",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuestionStatus::Pending),
            "answered" => Ok(QuestionStatus::Answered),
            "ignored" => Ok(QuestionStatus::Ignored),
            other => anyhow::bail!("unknown question status {other:?}"),
        }
    }
}

/// Row shape of the question listing query, usernames joined in.
#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub from_user: Option<Uuid>,
    pub from_username: Option<String>,
    pub to_user: Uuid,
    pub to_username: String,
    pub question: String,
    pub answer: Option<String>,
    pub is_anonymous: bool,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub answered_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    /// Absent for anonymous questions.
    pub from_user: Option<UserRef>,
    pub to_user: UserRef,
    pub question: String,
    pub answer: Option<String>,
    pub is_anonymous: bool,
    pub status: QuestionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub answered_at: Option<OffsetDateTime>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = anyhow::Error;

    fn try_from(r: QuestionRow) -> Result<Self, Self::Error> {
        let from_user = match (r.from_user, r.from_username) {
            (Some(id), Some(username)) => Some(UserRef { id, username }),
            _ => None,
        };
        Ok(Self {
            id: r.id,
            from_user,
            to_user: UserRef {
                id: r.to_user,
                username: r.to_username,
            },
            question: r.question,
            answer: r.answer,
            is_anonymous: r.is_anonymous,
            status: r.status.parse()?,
            created_at: r.created_at,
            answered_at: r.answered_at,
        })
    }
}

#[derive(Debug)]
pub struct NewQuestion {
    pub from_user: Option<Uuid>,
    pub to_user: Uuid,
    pub question: String,
    pub is_anonymous: bool,
}
