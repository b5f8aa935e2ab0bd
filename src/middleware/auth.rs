use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::{ROLE_ADMIN, ROLE_SUPER};
use crate::utils::token::{decode_claims, TOKEN_TYPE_ACCESS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub token_type: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub provider: String,
    pub verified: bool,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        self.sub
            .parse()
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        [ROLE_ADMIN, ROLE_SUPER]
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&self.role))
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn bearer_token(req: &Request) -> std::result::Result<String, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };
    Ok(token.to_string())
}

/// Validates the bearer access token and stores its claims in the request
/// extensions. Refresh tokens are rejected here; they are only good for the
/// refresh endpoint.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token,
        Err(resp) => return resp,
    };

    match decode_claims(&token) {
        Ok(claims) if claims.token_type == TOKEN_TYPE_ACCESS => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        _ => unauthorized("invalid_token"),
    }
}

pub async fn require_admin(mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token,
        Err(resp) => return resp,
    };

    match decode_claims(&token) {
        Ok(claims) if claims.token_type == TOKEN_TYPE_ACCESS => {
            if !claims.is_admin() {
                return (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" })))
                    .into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        _ => unauthorized("invalid_token"),
    }
}
