use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub quiz_id: Option<Uuid>,
    pub file_path: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub description: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
