//! In-process `QuestionRepo` for tests. Usernames resolve through the
//! paired `MemoryUserRepo`, the way the SQL joins do.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::QuestionRepo;
use super::repo_types::{NewQuestion, Question, QuestionStatus, UserRef};
use crate::auth::memory::MemoryUserRepo;

struct Stored {
    id: Uuid,
    from_user: Option<Uuid>,
    to_user: Uuid,
    question: String,
    answer: Option<String>,
    is_anonymous: bool,
    status: QuestionStatus,
    created_at: OffsetDateTime,
    answered_at: Option<OffsetDateTime>,
}

pub struct MemoryQuestionRepo {
    users: Arc<MemoryUserRepo>,
    rows: Mutex<Vec<Stored>>,
}

impl MemoryQuestionRepo {
    pub fn new(users: Arc<MemoryUserRepo>) -> Self {
        Self {
            users,
            rows: Mutex::new(Vec::new()),
        }
    }

    /// `None` when the recipient no longer exists.
    fn view(&self, s: &Stored) -> Option<Question> {
        let to_user = UserRef {
            id: s.to_user,
            username: self.users.username_of(s.to_user)?,
        };
        let from_user = s
            .from_user
            .and_then(|id| self.users.username_of(id).map(|username| UserRef { id, username }));
        Some(Question {
            id: s.id,
            from_user,
            to_user,
            question: s.question.clone(),
            answer: s.answer.clone(),
            is_anonymous: s.is_anonymous,
            status: s.status,
            created_at: s.created_at,
            answered_at: s.answered_at,
        })
    }

    fn select<F>(&self, keep: F) -> Vec<Question>
    where
        F: Fn(&Stored) -> bool,
    {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<Question> = rows.iter().filter(|&s| keep(s)).filter_map(|s| self.view(s)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

#[async_trait]
impl QuestionRepo for MemoryQuestionRepo {
    async fn create(&self, q: NewQuestion) -> anyhow::Result<Question> {
        let stored = Stored {
            id: Uuid::new_v4(),
            from_user: q.from_user,
            to_user: q.to_user,
            question: q.question,
            answer: None,
            is_anonymous: q.is_anonymous,
            status: QuestionStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            answered_at: None,
        };
        let view = self
            .view(&stored)
            .ok_or_else(|| anyhow::anyhow!("unknown recipient {}", q.to_user))?;
        self.rows.lock().unwrap().push(stored);
        Ok(view)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Question>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|s| s.id == id).and_then(|s| self.view(s)))
    }

    async fn list_received(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>> {
        Ok(self.select(|s| s.to_user == user_id))
    }

    async fn list_asked(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>> {
        Ok(self.select(|s| s.from_user == Some(user_id)))
    }

    async fn feed(&self, limit: i64) -> anyhow::Result<Vec<Question>> {
        let mut out = self.select(|s| s.status == QuestionStatus::Answered);
        out.sort_by(|a, b| b.answered_at.cmp(&a.answered_at));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn answer(
        &self,
        id: Uuid,
        answer: &str,
        answered_at: OffsetDateTime,
    ) -> anyhow::Result<Option<Question>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(s) = rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        s.answer = Some(answer.to_string());
        s.status = QuestionStatus::Answered;
        s.answered_at = Some(answered_at);
        Ok(self.view(s))
    }

    async fn set_status(&self, id: Uuid, status: QuestionStatus) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
