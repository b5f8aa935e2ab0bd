use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::game_dto::LeaderboardEntry;
use crate::error::Result;

/// Only the top slice is ever served; full ranking stays in the database.
pub const LEADERBOARD_SIZE: i64 = 50;

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub user_name: String,
    pub total_points: i32,
    pub level: i32,
    pub total_quizzes_passed: i32,
}

/// Dense 1-based ranks in the order the rows were returned. Ties on points
/// are already broken by user id in the query, so ranks are deterministic.
pub fn rank_entries(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardEntry {
            rank: idx as i64 + 1,
            user_id: row.user_id,
            user_name: row.user_name,
            total_points: row.total_points,
            level: row.level,
            total_quizzes_passed: row.total_quizzes_passed,
        })
        .collect()
}

#[derive(Clone)]
pub struct LeaderboardService {
    pool: PgPool,
}

impl LeaderboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn top(&self) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"SELECT up.user_id,
                      COALESCE(NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), ''), u.email) AS user_name,
                      up.total_points,
                      up.level,
                      up.total_quizzes_passed
               FROM user_progress up
               JOIN users u ON u.id = up.user_id
               ORDER BY up.total_points DESC, up.user_id ASC
               LIMIT $1"#,
        )
        .bind(LEADERBOARD_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rank_entries(rows))
    }

    /// Same ranking restricted to users with a completed attempt in the category.
    pub async fn top_by_category(&self, category_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"SELECT up.user_id,
                      COALESCE(NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), ''), u.email) AS user_name,
                      up.total_points,
                      up.level,
                      up.total_quizzes_passed
               FROM user_progress up
               JOIN users u ON u.id = up.user_id
               WHERE EXISTS (
                   SELECT 1 FROM quiz_attempts qa
                   JOIN quizzes qz ON qz.id = qa.quiz_id
                   WHERE qa.user_id = up.user_id
                     AND qa.status = 'completed'
                     AND qz.category_id = $1
               )
               ORDER BY up.total_points DESC, up.user_id ASC
               LIMIT $2"#,
        )
        .bind(category_id)
        .bind(LEADERBOARD_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rank_entries(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(points: i32) -> LeaderboardRow {
        LeaderboardRow {
            user_id: Uuid::new_v4(),
            user_name: "player".to_string(),
            total_points: points,
            level: points / 100 + 1,
            total_quizzes_passed: 0,
        }
    }

    #[test]
    fn ranks_are_assigned_in_input_order() {
        let entries = rank_entries(vec![row(300), row(200), row(200), row(50)]);
        let ranks: Vec<i64> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(entries[0].total_points, 300);
        assert_eq!(entries[3].total_points, 50);
    }

    #[test]
    fn empty_board_yields_no_entries() {
        assert!(rank_entries(Vec::new()).is_empty());
    }
}
