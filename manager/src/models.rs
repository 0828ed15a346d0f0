use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub created_at: i64,
}

impl Question {
    pub fn new(text: String) -> Self {
        Self {
            id: 0, // Will be set by database AUTOINCREMENT
            text,
            created_at: Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub created_at: i64,
}

impl Answer {
    pub fn new(question_id: i64, text: String) -> Self {
        Self {
            id: 0, // Will be set by database AUTOINCREMENT
            question_id,
            text,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// A question as presented to a connected client: the row itself, whether
/// its answer panel is open for this client, and the answers when it is.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuestionView {
    pub id: i64,
    pub text: String,
    pub created_at: i64,
    pub is_open: bool,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateQuestionRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateAnswerRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: Question,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionListResponse {
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: Answer,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerListResponse {
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    pub version: String,
    pub uptime: u64,
    pub question_subscribers: usize,
    pub answer_subscribers: usize,
}
