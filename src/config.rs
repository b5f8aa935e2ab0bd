use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub password_expiry_days: i64,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub base_backend_url: String,
    pub frontend_url: String,
    pub admin_console_url: String,
    pub mail_webhook_url: String,
    pub mail_webhook_secret: String,
    pub uploads_dir: String,
    pub public_rps: u32,
    pub api_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            access_token_minutes: get_env_parse("ACCESS_TOKEN_MINUTES")?,
            refresh_token_days: get_env_parse("REFRESH_TOKEN_DAYS")?,
            password_expiry_days: get_env_parse("PASSWORD_EXPIRY_DAYS")?,
            google_client_id: get_env("GOOGLE_CLIENT_ID")?,
            google_client_secret: get_env("GOOGLE_CLIENT_SECRET")?,
            base_backend_url: get_env("BASE_BACKEND_URL")?,
            frontend_url: get_env("FRONTEND_URL")?,
            admin_console_url: get_env("ADMIN_CONSOLE_URL")?,
            mail_webhook_url: get_env("MAIL_WEBHOOK_URL")?,
            mail_webhook_secret: get_env("MAIL_WEBHOOK_SECRET")?,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_rps: get_env_parse("PUBLIC_RPS")?,
            api_rps: get_env_parse("API_RPS")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
