use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::trim_optional_string;
use crate::models::answer::Answer;
use crate::models::question::{Question, QuestionType};
use crate::models::quiz::Quiz;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub icon: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCategoryPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub icon: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub color: Option<String>,

    pub is_active: Option<bool>,
}

/// Category joined with the count of its active quizzes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub is_active: bool,
    pub quiz_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnswerPayload {
    #[validate(length(min = 1, message = "Answer text is required"))]
    pub answer_text: String,

    #[serde(default)]
    pub is_correct: bool,

    pub position: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1, message = "Question text is required"))]
    pub question_text: String,

    pub question_type: QuestionType,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub explanation: Option<String>,

    #[validate(range(min = 1, message = "Points must be at least 1"))]
    pub points: Option<i32>,

    pub position: Option<i32>,

    #[serde(default)]
    pub answers: Vec<CreateAnswerPayload>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizPayload {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    pub category_id: Uuid,

    #[validate(custom(function = "crate::utils::validation::validate_difficulty"))]
    pub difficulty: Option<String>,

    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: Option<i32>,

    #[validate(range(min = 1, message = "Total questions must be at least 1"))]
    pub total_questions: Option<i32>,

    #[validate(range(min = 0, max = 100, message = "Pass score must be between 0 and 100"))]
    pub pass_score: Option<i32>,

    #[validate(range(min = 0, message = "Points reward cannot be negative"))]
    pub points_reward: Option<i32>,

    pub questions: Option<Vec<CreateQuestionPayload>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQuizPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    pub category_id: Option<Uuid>,

    #[validate(custom(function = "crate::utils::validation::validate_difficulty"))]
    pub difficulty: Option<String>,

    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: Option<i32>,

    #[validate(range(min = 1, message = "Total questions must be at least 1"))]
    pub total_questions: Option<i32>,

    #[validate(range(min = 0, max = 100, message = "Pass score must be between 0 and 100"))]
    pub pass_score: Option<i32>,

    #[validate(range(min = 0, message = "Points reward cannot be negative"))]
    pub points_reward: Option<i32>,

    pub is_active: Option<bool>,
}

/// Flat listing row; question_count counts active questions only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizListItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub difficulty: String,
    pub time_limit_minutes: i32,
    pub total_questions: i32,
    pub pass_score: i32,
    pub points_reward: i32,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizListResponse {
    pub items: Vec<QuizListItem>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct QuizListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizDetailResponse {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub category_name: String,
    pub questions: Vec<QuestionWithAnswers>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CategoryListQuery {
    pub search: Option<String>,
}
