pub mod auth;
pub mod health;
pub mod progress;
pub mod tasks;
