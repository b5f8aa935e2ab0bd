pub mod answer;
pub mod attempt;
pub mod badge;
pub mod category;
pub mod outbound_email;
pub mod progress;
pub mod question;
pub mod quiz;
pub mod resource;
pub mod session;
pub mod user;
pub mod user_answer;
pub mod verification;
