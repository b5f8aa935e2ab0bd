use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::account_dto::{
        AuthResponse, EmailVerificationConfirmPayload, EmailVerificationRequestPayload,
        ListUsersQuery, LoginPayload, PasswordResetConfirmPayload, PasswordResetRequestPayload,
        RefreshPayload, RegisterPayload, UpdateUserPayload, UserResponse,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    utils::token::{decode_claims, issue_token_pair, TOKEN_TYPE_REFRESH},
    AppState,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.account_service.register(payload).await?;
    let token = issue_token_pair(&user)?;
    state
        .account_service
        .store_session(user.id, &token.refresh)
        .await?;

    if let Err(err) = state
        .mail_service
        .send_account_created(&user.email, &user.display_name())
        .await
    {
        tracing::warn!("failed to enqueue welcome email: {}", err);
    }

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .account_service
        .login(&payload.email, &payload.password)
        .await?;
    let token = issue_token_pair(&user)?;
    state
        .account_service
        .store_session(user.id, &token.refresh)
        .await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// Rotates the session: the presented refresh token must match the stored
/// one, and a fresh pair replaces it.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let claims = decode_claims(&payload.refresh)?;
    if claims.token_type != TOKEN_TYPE_REFRESH {
        return Err(Error::Unauthorized("Invalid/expired token".to_string()));
    }

    let user = state
        .account_service
        .user_for_refresh(claims.user_id()?, &payload.refresh)
        .await?;
    let token = issue_token_pair(&user)?;
    state
        .account_service
        .store_session(user.id, &token.refresh)
        .await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

#[axum::debug_handler]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (user, reset_url) = state
        .account_service
        .request_password_reset(&payload.email, payload.is_admin)
        .await?;

    if let Err(err) = state
        .mail_service
        .send_password_reset(&user.email, &user.display_name(), &reset_url)
        .await
    {
        tracing::warn!("failed to enqueue password reset email: {}", err);
    }

    Ok(Json(json!({
        "message": format!(
            "Password resent link sent to {}. If you didn't receive an email in your inbox, check your spam/junk folders",
            user.email
        )
    })))
}

#[axum::debug_handler]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if payload.new_password != payload.confirm_password {
        return Err(Error::BadRequest("Passwords must match.".to_string()));
    }
    state
        .account_service
        .confirm_password_reset(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(json!({ "message": "password reset successful" })))
}

#[axum::debug_handler]
pub async fn request_email_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailVerificationRequestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let code = state
        .account_service
        .request_verification(&payload.email)
        .await?;

    if let Err(err) = state
        .mail_service
        .send_verification_code(&payload.email, &code)
        .await
    {
        tracing::warn!("failed to enqueue verification email: {}", err);
    }

    Ok(Json(json!({
        "message": format!("verification code sent to {}", payload.email)
    })))
}

#[axum::debug_handler]
pub async fn confirm_email_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailVerificationConfirmPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .account_service
        .confirm_verification(&payload.email, &payload.code)
        .await?;

    Ok(Json(json!({
        "verified": true,
        "message": "Account verification successful"
    })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.account_service.get_user(claims.user_id()?).await?;
    Ok(Json(UserResponse::from(user)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.account_service.get_user(user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Profile edits are limited to the owner; admins may edit anyone.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if claims.user_id()? != user_id && !claims.is_admin() {
        return Err(Error::Forbidden(
            "You can only update your own profile".to_string(),
        ));
    }
    let user = state.account_service.update_user(user_id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse> {
    let users = state.account_service.list_users(query).await?;
    Ok(Json(users))
}
