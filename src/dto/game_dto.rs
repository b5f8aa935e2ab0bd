use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::trim_optional_string;
use crate::dto::quiz_dto::QuizDetailResponse;
use crate::models::attempt::QuizAttempt;
use crate::models::badge::Badge;
use crate::models::progress::UserProgress;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartQuizPayload {
    pub quiz_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerPayload {
    pub question_id: Uuid,

    /// Required for multiple_choice and true_false questions.
    pub answer_id: Option<Uuid>,

    /// Required for fill_blank questions.
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinishQuizPayload {
    pub attempt_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartQuizResponse {
    pub attempt: QuizAttempt,
    pub quiz: QuizDetailResponse,
}

/// Correctness is intentionally not echoed back while the attempt is live.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub saved: bool,
    pub question_id: Uuid,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerReview {
    pub question_id: Uuid,
    pub question_text: String,
    pub question_type: String,
    pub explanation: String,
    pub selected_answer_id: Option<Uuid>,
    pub selected_answer_text: Option<String>,
    pub text_answer: String,
    pub is_correct: bool,
    pub correct_answer: Option<String>,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub badges_earned: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResultResponse {
    pub attempt: QuizAttempt,
    pub answers: Vec<AnswerReview>,
    pub badges_earned: Vec<Badge>,
    pub progress: ProgressResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub total_points: i32,
    pub level: i32,
    pub total_quizzes_passed: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EarnedBadge {
    pub id: Uuid,
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}
