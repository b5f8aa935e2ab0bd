use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const TYPE_MULTIPLE_CHOICE: &str = "multiple_choice";
pub const TYPE_TRUE_FALSE: &str = "true_false";
pub const TYPE_FILL_BLANK: &str = "fill_blank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => TYPE_MULTIPLE_CHOICE,
            QuestionType::TrueFalse => TYPE_TRUE_FALSE,
            QuestionType::FillBlank => TYPE_FILL_BLANK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub question_type: String,
    pub explanation: String,
    pub points: i32,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Fill-in-the-blank answers are stored but never auto-graded.
    pub fn is_auto_graded(&self) -> bool {
        self.question_type != TYPE_FILL_BLANK
    }
}
