use crate::config::get_config;
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::Serialize;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

fn build_claims(user: &User, token_type: &str, ttl: Duration) -> Claims {
    Claims {
        sub: user.id.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
        token_type: token_type.to_string(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.role.clone(),
        provider: user.auth_provider.clone(),
        verified: user.verified,
    }
}

fn sign(claims: &Claims) -> Result<String> {
    let config = get_config();
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

/// Issues an access/refresh pair carrying the user's profile claims.
pub fn issue_token_pair(user: &User) -> Result<TokenPair> {
    let config = get_config();
    let access_ttl = Duration::minutes(config.access_token_minutes);
    let refresh_ttl = Duration::days(config.refresh_token_days);

    let access = sign(&build_claims(user, TOKEN_TYPE_ACCESS, access_ttl))?;
    let refresh = sign(&build_claims(user, TOKEN_TYPE_REFRESH, refresh_ttl))?;

    Ok(TokenPair {
        access,
        refresh,
        expires_in: access_ttl.num_seconds(),
    })
}

pub fn decode_claims(token: &str) -> Result<Claims> {
    let config = get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthorized("Invalid/expired token".to_string()))?;
    Ok(data.claims)
}

pub fn generate_random_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Four digit code mailed out for email verification.
pub fn generate_verification_code() -> String {
    format!("{:04}", thread_rng().gen_range(0..10_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn init_test_config() {
        std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        std::env::set_var("DATABASE_URL", "postgres://localhost/unused");
        std::env::set_var("JWT_SECRET", "unit_test_secret");
        std::env::set_var("ACCESS_TOKEN_MINUTES", "15");
        std::env::set_var("REFRESH_TOKEN_DAYS", "7");
        std::env::set_var("PASSWORD_EXPIRY_DAYS", "120");
        std::env::set_var("GOOGLE_CLIENT_ID", "client-id");
        std::env::set_var("GOOGLE_CLIENT_SECRET", "client-secret");
        std::env::set_var("BASE_BACKEND_URL", "http://localhost:8000");
        std::env::set_var("FRONTEND_URL", "http://localhost:3000");
        std::env::set_var("ADMIN_CONSOLE_URL", "http://localhost:3001");
        std::env::set_var("MAIL_WEBHOOK_URL", "http://localhost/mail");
        std::env::set_var("MAIL_WEBHOOK_SECRET", "mail-secret");
        std::env::set_var("PUBLIC_RPS", "100");
        std::env::set_var("API_RPS", "100");
        let _ = crate::config::init_config();
    }

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "player@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            phone: None,
            gender: None,
            profession: None,
            profile_picture: None,
            role: "user".to_string(),
            auth_provider: "email".to_string(),
            verified: true,
            is_active: true,
            password_expires_at: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pair_round_trips_and_carries_profile() {
        init_test_config();
        let user = sample_user();
        let pair = issue_token_pair(&user).expect("pair");
        assert_eq!(pair.expires_in, 15 * 60);

        let access = decode_claims(&pair.access).expect("access claims");
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);
        assert_eq!(access.sub, user.id.to_string());
        assert_eq!(access.email, user.email);
        assert!(access.verified);

        let refresh = decode_claims(&pair.refresh).expect("refresh claims");
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn garbage_token_is_rejected() {
        init_test_config();
        assert!(decode_claims("not-a-jwt").is_err());
    }

    #[test]
    fn verification_code_is_four_digits() {
        for _ in 0..50 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
