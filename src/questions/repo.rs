use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewQuestion, Question, QuestionRow, QuestionStatus};

#[async_trait]
pub trait QuestionRepo: Send + Sync {
    async fn create(&self, new_question: NewQuestion) -> anyhow::Result<Question>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Question>>;
    /// Newest first.
    async fn list_received(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>>;
    /// Newest first. Anonymous questions carry no sender and never show up here.
    async fn list_asked(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>>;
    /// Answered questions, most recent answer first.
    async fn feed(&self, limit: i64) -> anyhow::Result<Vec<Question>>;
    async fn answer(
        &self,
        id: Uuid,
        answer: &str,
        answered_at: OffsetDateTime,
    ) -> anyhow::Result<Option<Question>>;
    async fn set_status(&self, id: Uuid, status: QuestionStatus) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgQuestionRepo {
    db: PgPool,
}

impl PgQuestionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const SELECT_QUESTION: &str = r#"
    SELECT q.id, q.from_user, fu.username AS from_username,
           q.to_user, tu.username AS to_username,
           q.question, q.answer, q.is_anonymous, q.status,
           q.created_at, q.answered_at
      FROM questions q
      LEFT JOIN users fu ON fu.id = q.from_user
      JOIN users tu ON tu.id = q.to_user
"#;

fn convert(rows: Vec<QuestionRow>) -> anyhow::Result<Vec<Question>> {
    rows.into_iter().map(Question::try_from).collect()
}

#[async_trait]
impl QuestionRepo for PgQuestionRepo {
    async fn create(&self, q: NewQuestion) -> anyhow::Result<Question> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO questions (from_user, to_user, question, is_anonymous, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING id
            "#,
        )
        .bind(q.from_user)
        .bind(q.to_user)
        .bind(&q.question)
        .bind(q.is_anonymous)
        .fetch_one(&self.db)
        .await?;

        self.find(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("question {id} vanished after insert"))
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!("{SELECT_QUESTION} WHERE q.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Question::try_from).transpose()
    }

    async fn list_received(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "{SELECT_QUESTION} WHERE q.to_user = $1 ORDER BY q.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn list_asked(&self, user_id: Uuid) -> anyhow::Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "{SELECT_QUESTION} WHERE q.from_user = $1 ORDER BY q.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn feed(&self, limit: i64) -> anyhow::Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "{SELECT_QUESTION} WHERE q.status = 'answered' ORDER BY q.answered_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn answer(
        &self,
        id: Uuid,
        answer: &str,
        answered_at: OffsetDateTime,
    ) -> anyhow::Result<Option<Question>> {
        let res = sqlx::query(
            r#"
            UPDATE questions
               SET answer = $2, status = 'answered', answered_at = $3
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(answer)
        .bind(answered_at)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn set_status(&self, id: Uuid, status: QuestionStatus) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE questions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
