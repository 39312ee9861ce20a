use serde::{Deserialize, Serialize};

use super::repo_types::Question;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendQuestionRequest {
    pub to_user_id: Option<String>,
    pub question: Option<String>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnswerRequest {
    pub answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionListResponse {
    pub success: bool,
    pub questions: Vec<Question>,
}

impl From<Vec<Question>> for QuestionListResponse {
    fn from(questions: Vec<Question>) -> Self {
        Self {
            success: true,
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub message: &'static str,
    pub question: Question,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: &'static str,
}
