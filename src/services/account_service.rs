use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::account_dto::{
    ListUsersQuery, RegisterPayload, UpdateUserPayload, UserListResponse, UserResponse,
};
use crate::error::{Error, Result};
use crate::models::user::{User, PROVIDER_GOOGLE};
use crate::models::verification::{PasswordResetToken, VerificationCode};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::{generate_random_token, generate_verification_code};

const RESET_TOKEN_HOURS: i64 = 24;
const VERIFICATION_CODE_MINUTES: i64 = 10;

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();

        let existing: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE email = $1"#)
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(Error::BadRequest(
                "The user with the email provided exist".to_string(),
            ));
        }

        if payload.password != payload.confirm_password {
            return Err(Error::BadRequest("Passwords must match.".to_string()));
        }

        let password_hash = hash_password(&payload.password)?;
        let password_expires_at = Utc::now() + Duration::days(get_config().password_expiry_days);

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users
                   (email, password_hash, first_name, last_name, phone, gender, profession,
                    password_expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(payload.first_name)
        .bind(payload.last_name)
        .bind(payload.phone)
        .bind(payload.gender)
        .bind(payload.profession)
        .bind(password_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Credential check plus the expiry gate; a successful login stamps
    /// `last_login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE email = $1 AND is_active = TRUE"#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid username or password.".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(Error::Unauthorized(
                "Invalid username or password.".to_string(),
            ));
        }

        if let Some(expires_at) = user.password_expires_at {
            if expires_at < Utc::now() {
                return Err(Error::BadRequest(
                    "Password expired. please reset your password to continue.".to_string(),
                ));
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET last_login = NOW(), updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// One session row per user; re-login rotates the stored refresh token.
    pub async fn store_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO sessions (user_id, refresh_token)
               VALUES ($1, $2)
               ON CONFLICT (user_id)
               DO UPDATE SET refresh_token = EXCLUDED.refresh_token, updated_at = NOW()"#,
        )
        .bind(user_id)
        .bind(refresh_token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Validates a refresh token against the stored session and returns its
    /// owner. The caller issues the replacement pair.
    pub async fn user_for_refresh(&self, user_id: Uuid, refresh_token: &str) -> Result<User> {
        let session: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND refresh_token = $2"#,
        )
        .bind(user_id)
        .bind(refresh_token)
        .fetch_one(&self.pool)
        .await?;
        if session == 0 {
            return Err(Error::Unauthorized("Invalid/expired token".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid/expired token".to_string()))?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    pub async fn list_users(&self, query: ListUsersQuery) -> Result<UserListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let pattern = query.search.map(|s| format!("%{}%", s));

        let users = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users
               WHERE ($1::text IS NULL
                      OR email ILIKE $1
                      OR first_name ILIKE $1
                      OR last_name ILIKE $1)
               ORDER BY created_at DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(&pattern)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM users
               WHERE ($1::text IS NULL
                      OR email ILIKE $1
                      OR first_name ILIKE $1
                      OR last_name ILIKE $1)"#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(UserListResponse {
            items: users.into_iter().map(UserResponse::from).collect(),
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn update_user(&self, user_id: Uuid, payload: UpdateUserPayload) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   phone = COALESCE($4, phone),
                   gender = COALESCE($5, gender),
                   profession = COALESCE($6, profession),
                   profile_picture = COALESCE($7, profile_picture),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(payload.first_name)
        .bind(payload.last_name)
        .bind(payload.phone)
        .bind(payload.gender)
        .bind(payload.profession)
        .bind(payload.profile_picture)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    /// Issues a single-use reset token and builds the link the email carries.
    /// `is_admin` switches the link base to the admin console.
    pub async fn request_password_reset(&self, email: &str, is_admin: bool) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::BadRequest("User doesn't exist.".to_string()))?;

        let token = generate_random_token(64);
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_HOURS);

        sqlx::query(
            r#"INSERT INTO password_reset_tokens (user_id, token, expires_at)
               VALUES ($1, $2, $3)"#,
        )
        .bind(user.id)
        .bind(&token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        let config = get_config();
        let reset_url = if is_admin {
            format!("{}/password-reset/{}", config.admin_console_url, token)
        } else {
            format!("{}/reset/{}", config.frontend_url, token)
        };

        Ok((user, reset_url))
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let reset = sqlx::query_as::<_, PasswordResetToken>(
            r#"SELECT * FROM password_reset_tokens
               WHERE token = $1 AND used = FALSE AND expires_at > NOW()
               FOR UPDATE"#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::BadRequest("Invalid reset token.".to_string()))?;

        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(reset.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("User with ID not found.".to_string()))?;

        if verify_password(new_password, &user.password_hash)? {
            return Err(Error::BadRequest(
                "You cannot reuse an old password.".to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        let password_expires_at = Utc::now() + Duration::days(get_config().password_expiry_days);

        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET password_hash = $2, password_expires_at = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user.id)
        .bind(&password_hash)
        .bind(password_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"UPDATE password_reset_tokens SET used = TRUE WHERE id = $1"#)
            .bind(reset.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Creates a short-lived 4-digit code for the address. The code is not
    /// tied to an existing account until confirmation.
    pub async fn request_verification(&self, email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_MINUTES);

        sqlx::query(
            r#"INSERT INTO verification_codes (email, code, expires_at)
               VALUES ($1, $2, $3)"#,
        )
        .bind(&email)
        .bind(&code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(code)
    }

    pub async fn confirm_verification(&self, email: &str, code: &str) -> Result<User> {
        let email = email.trim().to_lowercase();

        let stored = sqlx::query_as::<_, VerificationCode>(
            r#"SELECT * FROM verification_codes
               WHERE email = $1 AND consumed = FALSE
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::BadRequest("Invalid verification code".to_string()))?;

        if stored.expires_at < Utc::now() {
            return Err(Error::BadRequest(
                "verification code has expired".to_string(),
            ));
        }
        if stored.code != code {
            return Err(Error::BadRequest("Invalid code".to_string()));
        }

        let unverified = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE email = $1 AND verified = FALSE"#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let user = match unverified {
            Some(user) => user,
            None => {
                let verified: i64 = sqlx::query_scalar(
                    r#"SELECT COUNT(*) FROM users WHERE email = $1 AND verified = TRUE"#,
                )
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
                if verified > 0 {
                    return Err(Error::NotFound("account already verified".to_string()));
                }
                return Err(Error::NotFound("verification failed".to_string()));
            }
        };

        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET verified = TRUE, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(r#"UPDATE verification_codes SET consumed = TRUE WHERE id = $1"#)
            .bind(stored.id)
            .execute(&self.pool)
            .await?;

        Ok(user)
    }

    /// Resolves a Google-asserted identity to a local account, creating one
    /// on first login. An email already registered through another provider
    /// is rejected rather than silently linked.
    pub async fn find_or_create_google_user(
        &self,
        email: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<User> {
        let email = email.trim().to_lowercase();

        let existing = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(user) = existing {
            if user.auth_provider != PROVIDER_GOOGLE {
                return Err(Error::BadRequest(
                    "Account exists with different loin provider".to_string(),
                ));
            }
            let user = sqlx::query_as::<_, User>(
                r#"UPDATE users SET last_login = NOW(), updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?;
            return Ok(user);
        }

        // Google accounts never log in with this password; it only keeps the
        // column non-null.
        let password_hash = hash_password(&generate_random_token(32))?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users
                   (email, password_hash, first_name, last_name, auth_provider, verified, last_login)
               VALUES ($1, $2, $3, $4, 'google', TRUE, NOW())
               RETURNING *"#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
