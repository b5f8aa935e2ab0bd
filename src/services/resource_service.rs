use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::resource::Resource;

/// Study material uploads (PDFs, images, plain text) attached to quizzes.
/// Files live on disk under the uploads dir; rows carry the metadata.
#[derive(Clone)]
pub struct ResourceService {
    pool: PgPool,
}

impl ResourceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_resource(
        &self,
        quiz_id: Option<Uuid>,
        file_path: &str,
        file_name: &str,
        content_type: Option<String>,
        description: String,
        uploaded_by: Uuid,
    ) -> Result<Resource> {
        if let Some(quiz_id) = quiz_id {
            let exists: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM quizzes WHERE id = $1"#)
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?;
            if exists == 0 {
                return Err(Error::BadRequest("Quiz not found".to_string()));
            }
        }

        let resource = sqlx::query_as::<_, Resource>(
            r#"INSERT INTO resources
                   (quiz_id, file_path, file_name, content_type, description, uploaded_by)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(quiz_id)
        .bind(file_path)
        .bind(file_name)
        .bind(content_type)
        .bind(description)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(resource)
    }

    pub async fn list_resources(&self, quiz_id: Option<Uuid>) -> Result<Vec<Resource>> {
        let resources = sqlx::query_as::<_, Resource>(
            r#"SELECT * FROM resources
               WHERE ($1::uuid IS NULL OR quiz_id = $1)
               ORDER BY created_at DESC"#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(resources)
    }

    /// Uploader-or-admin delete; the file removal is best effort since the
    /// row is the source of truth.
    pub async fn delete_resource(
        &self,
        resource_id: Uuid,
        requester_id: Uuid,
        requester_is_admin: bool,
    ) -> Result<()> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"SELECT * FROM resources WHERE id = $1"#,
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;

        if !requester_is_admin && resource.uploaded_by != Some(requester_id) {
            return Err(Error::Forbidden(
                "You can only delete resources you uploaded".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM resources WHERE id = $1"#)
            .bind(resource_id)
            .execute(&self.pool)
            .await?;

        let _ = tokio::fs::remove_file(&resource.file_path).await;
        Ok(())
    }
}
