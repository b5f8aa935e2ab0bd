use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{
        CategoryListQuery, CreateCategoryPayload, CreateQuizPayload, QuizListQuery,
        UpdateCategoryPayload, UpdateQuizPayload,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<impl IntoResponse> {
    let categories = state.quiz_service.list_categories(query.search).await?;
    Ok(Json(categories))
}

#[axum::debug_handler]
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let category = state.quiz_service.get_category(category_id).await?;
    Ok(Json(category))
}

#[axum::debug_handler]
pub async fn category_quizzes(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.quizzes_in_category(category_id).await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let category = state.quiz_service.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[axum::debug_handler]
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let category = state
        .quiz_service
        .update_category(category_id, payload)
        .await?;
    Ok(Json(category))
}

#[axum::debug_handler]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(query): Query<QuizListQuery>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_quizzes(query).await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn popular_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.popular().await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn recommended_quizzes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.recommended(claims.user_id()?).await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.quiz_detail(quiz_id).await?;
    Ok(Json(quiz))
}

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state
        .quiz_service
        .create_quiz(payload, claims.user_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<UpdateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.update_quiz(quiz_id, payload).await?;
    Ok(Json(quiz))
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_quiz(quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_badges(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let badges = state.badge_service.list_badges().await?;
    Ok(Json(badges))
}

#[axum::debug_handler]
pub async fn my_badges(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let badges = state.badge_service.badges_for_user(claims.user_id()?).await?;
    Ok(Json(badges))
}
