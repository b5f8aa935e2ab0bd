use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Singleton per user, mutated only by the finish step of the game flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_points: i32,
    pub total_quizzes_taken: i32,
    pub total_quizzes_passed: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_quiz_date: Option<NaiveDate>,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
