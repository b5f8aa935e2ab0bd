use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::get_config,
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "png", "jpg", "jpeg", "txt"];

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ResourceListQuery {
    pub quiz_id: Option<Uuid>,
}

#[axum::debug_handler]
pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ResourceListQuery>,
) -> Result<impl IntoResponse> {
    let resources = state.resource_service.list_resources(query.quiz_id).await?;
    Ok(Json(resources))
}

/// Multipart upload: `file` plus optional `quiz_id` and `description`
/// fields. Files are stored under the uploads dir with generated names so
/// user-supplied filenames never touch the filesystem.
#[axum::debug_handler]
pub async fn upload_resource(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;

    let mut quiz_id: Option<Uuid> = None;
    let mut description = String::new();
    let mut stored: Option<(String, String, Option<String>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name == "quiz_id" {
            let data = field.text().await?;
            let trimmed = data.trim();
            if !trimmed.is_empty() {
                quiz_id = Some(
                    trimmed
                        .parse()
                        .map_err(|_| Error::BadRequest("Invalid quiz_id".to_string()))?,
                );
            }
        } else if name == "description" {
            description = field.text().await?.trim().to_string();
        } else if name == "file" {
            let file_name = field.file_name().unwrap_or("resource").to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field.bytes().await?;
            if data.is_empty() {
                continue;
            }

            let extension = std::path::Path::new(&file_name)
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase())
                .unwrap_or_default();

            if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
                return Err(Error::BadRequest(format!(
                    "File type not allowed. Allowed: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                )));
            }

            let upload_dir = format!("{}/resources", get_config().uploads_dir);
            tokio::fs::create_dir_all(&upload_dir).await?;
            let file_id = Uuid::new_v4();
            let path = format!("{}/{}.{}", upload_dir, file_id, extension);
            tokio::fs::write(&path, data).await?;
            stored = Some((path, file_name, content_type));
        }
    }

    let Some((file_path, file_name, content_type)) = stored else {
        return Err(Error::BadRequest("A file is required".to_string()));
    };

    let resource = match state
        .resource_service
        .create_resource(
            quiz_id,
            &file_path,
            &file_name,
            content_type,
            description,
            user_id,
        )
        .await
    {
        Ok(resource) => resource,
        Err(err) => {
            let _ = tokio::fs::remove_file(&file_path).await;
            return Err(err);
        }
    };

    Ok((StatusCode::CREATED, Json(resource)))
}

#[axum::debug_handler]
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(resource_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .resource_service
        .delete_resource(resource_id, claims.user_id()?, claims.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
