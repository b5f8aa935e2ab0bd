use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect},
};
use serde::Deserialize;

use crate::{
    dto::account_dto::AuthResponse,
    error::{Error, Result},
    utils::token::issue_token_pair,
    AppState,
};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Sends the browser to Google's consent screen.
#[axum::debug_handler]
pub async fn google_redirect(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let url = state.google_service.authorization_url().await?;
    Ok(Redirect::temporary(&url))
}

/// Landing point for Google's redirect. Verifies the anti-forgery state,
/// trades the code for an id_token and signs the user in locally.
#[axum::debug_handler]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<impl IntoResponse> {
    if let Some(error) = query.error {
        return Err(Error::BadRequest(error));
    }

    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(Error::BadRequest("Code and state are required".to_string()));
    };

    state.google_service.consume_state(&oauth_state).await?;

    let tokens = state.google_service.exchange_code(&code).await?;
    let identity = state.google_service.decode_id_token(&tokens.id_token)?;

    let user = state
        .account_service
        .find_or_create_google_user(&identity.email, identity.given_name, identity.family_name)
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
