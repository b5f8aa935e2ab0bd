use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use sqlx::PgPool;
use url::Url;

use crate::config::get_config;
use crate::error::{Error, Result};
use crate::utils::token::generate_random_token;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "openid",
];

const STATE_TTL_MINUTES: i64 = 10;
const STATE_LENGTH: usize = 30;

/// Token payload returned by Google's code exchange.
#[derive(Debug, Deserialize)]
pub struct GoogleTokens {
    pub id_token: String,
    pub access_token: String,
}

/// Identity claims carried in the Google id_token.
#[derive(Debug, Deserialize)]
pub struct GoogleIdClaims {
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleService {
    pool: PgPool,
    client: Client,
}

impl GoogleService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            client: Client::new(),
        }
    }

    fn redirect_uri(&self) -> String {
        format!("{}/api/auth/google/callback", get_config().base_backend_url)
    }

    /// Builds the consent-screen URL and persists the anti-forgery state.
    /// The state is checked and burned by the callback.
    pub async fn authorization_url(&self) -> Result<String> {
        let state = generate_random_token(STATE_LENGTH);

        sqlx::query(r#"DELETE FROM oauth_states WHERE expires_at <= NOW()"#)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"INSERT INTO oauth_states (state, expires_at)
               VALUES ($1, NOW() + make_interval(mins => $2))"#,
        )
        .bind(&state)
        .bind(STATE_TTL_MINUTES as i32)
        .execute(&self.pool)
        .await?;

        let config = get_config();
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", config.google_client_id.as_str()),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("scope", SCOPES.join(" ").as_str()),
                ("state", state.as_str()),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| Error::Internal(format!("Failed to build Google auth URL: {}", e)))?;

        Ok(url.into())
    }

    /// Burns a state token. A miss means the state was never issued, already
    /// used or expired.
    pub async fn consume_state(&self, state: &str) -> Result<()> {
        let res = sqlx::query(
            r#"DELETE FROM oauth_states WHERE state = $1 AND expires_at > NOW()"#,
        )
        .bind(state)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::BadRequest("CSRF check failed.".to_string()));
        }
        Ok(())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens> {
        let config = get_config();
        let redirect_uri = self.redirect_uri();
        let form = [
            ("code", code),
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Google token exchange failed: {}",
                body
            )));
        }

        let tokens = response.json::<GoogleTokens>().await?;
        Ok(tokens)
    }

    /// The id_token comes straight off the TLS channel with Google, so its
    /// signature is not re-verified here; only the claim shape is parsed.
    pub fn decode_id_token(&self, id_token: &str) -> Result<GoogleIdClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<GoogleIdClaims>(
            id_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .map_err(|_| Error::Unauthorized("Invalid Google id_token".to_string()))?;

        Ok(data.claims)
    }
}
