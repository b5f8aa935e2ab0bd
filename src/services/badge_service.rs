use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::game_dto::EarnedBadge;
use crate::error::Result;
use crate::models::badge::Badge;

#[derive(Debug, FromRow)]
struct EarnedBadgeRow {
    id: Uuid,
    earned_at: DateTime<Utc>,
    badge_id: Uuid,
    name: String,
    description: String,
    badge_type: String,
    icon: String,
    color: String,
    points_required: i32,
    category_id: Option<Uuid>,
    is_active: bool,
    badge_created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BadgeService {
    pool: PgPool,
}

impl BadgeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_badges(&self) -> Result<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(
            r#"SELECT * FROM badges
               WHERE is_active = TRUE
               ORDER BY points_required ASC, name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(badges)
    }

    pub async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<EarnedBadge>> {
        let rows = sqlx::query_as::<_, EarnedBadgeRow>(
            r#"SELECT ub.id,
                      ub.earned_at,
                      b.id AS badge_id,
                      b.name,
                      b.description,
                      b.badge_type,
                      b.icon,
                      b.color,
                      b.points_required,
                      b.category_id,
                      b.is_active,
                      b.created_at AS badge_created_at
               FROM user_badges ub
               JOIN badges b ON b.id = ub.badge_id
               WHERE ub.user_id = $1
               ORDER BY ub.earned_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EarnedBadge {
                id: row.id,
                earned_at: row.earned_at,
                badge: Badge {
                    id: row.badge_id,
                    name: row.name,
                    description: row.description,
                    badge_type: row.badge_type,
                    icon: row.icon,
                    color: row.color,
                    points_required: row.points_required,
                    category_id: row.category_id,
                    is_active: row.is_active,
                    created_at: row.badge_created_at,
                },
            })
            .collect())
    }
}
