pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    account_service::AccountService, badge_service::BadgeService, game_service::GameService,
    google_service::GoogleService, leaderboard_service::LeaderboardService,
    mail_service::MailService, quiz_service::QuizService, resource_service::ResourceService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub account_service: AccountService,
    pub google_service: GoogleService,
    pub quiz_service: QuizService,
    pub game_service: GameService,
    pub leaderboard_service: LeaderboardService,
    pub badge_service: BadgeService,
    pub mail_service: MailService,
    pub resource_service: ResourceService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let account_service = AccountService::new(pool.clone());
        let google_service = GoogleService::new(pool.clone());
        let quiz_service = QuizService::new(pool.clone());
        let game_service = GameService::new(pool.clone());
        let leaderboard_service = LeaderboardService::new(pool.clone());
        let badge_service = BadgeService::new(pool.clone());
        let mail_service = MailService::new(pool.clone(), config.mail_webhook_url.clone());
        let resource_service = ResourceService::new(pool.clone());

        Self {
            pool,
            account_service,
            google_service,
            quiz_service,
            game_service,
            leaderboard_service,
            badge_service,
            mail_service,
            resource_service,
        }
    }
}
