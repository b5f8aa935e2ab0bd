use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::trim_optional_string;
use crate::models::user::User;
use crate::utils::token::TokenPair;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub confirm_password: String,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshPayload {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetRequestPayload {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    /// Picks the admin console over the user frontend as the base of the
    /// reset link.
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetConfirmPayload {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailVerificationRequestPayload {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailVerificationConfirmPayload {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 4, max = 4, message = "Code must be 4 digits"))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub profession: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub profile_picture: Option<String>,
    pub role: String,
    pub auth_provider: String,
    pub verified: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            phone: value.phone,
            gender: value.gender,
            profession: value.profession,
            profile_picture: value.profile_picture,
            role: value.role,
            auth_provider: value.auth_provider,
            verified: value.verified,
            is_active: value.is_active,
            last_login: value.last_login,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}
