pub mod account_service;
pub mod badge_service;
pub mod game_service;
pub mod google_service;
pub mod leaderboard_service;
pub mod mail_service;
pub mod quiz_service;
pub mod resource_service;
