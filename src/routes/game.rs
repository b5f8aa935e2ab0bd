use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::game_dto::{
        FinishQuizPayload, StartQuizPayload, StartQuizResponse, SubmitAnswerPayload,
        SubmitAnswerResponse,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

/// Starts (or resumes) an attempt and hands back the quiz with its
/// questions so the client can render the whole run.
#[axum::debug_handler]
pub async fn start_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let attempt = state
        .game_service
        .start_attempt(user_id, payload.quiz_id)
        .await?;
    let quiz = state.quiz_service.quiz_detail(payload.quiz_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse { attempt, quiz }),
    ))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let saved = state
        .game_service
        .submit_answer(claims.user_id()?, &payload)
        .await?;

    Ok(Json(SubmitAnswerResponse {
        saved: true,
        question_id: saved.question_id,
        answered_at: saved.answered_at,
    }))
}

#[axum::debug_handler]
pub async fn finish_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<FinishQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .game_service
        .finish_attempt(claims.user_id()?, payload.attempt_id)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn my_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let progress = state.game_service.get_progress(claims.user_id()?).await?;
    Ok(Json(progress))
}
