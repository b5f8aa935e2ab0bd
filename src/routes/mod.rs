pub mod account;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod quiz;
pub mod resource;
pub mod social;
