//! CLI command implementations.

mod ask;
mod auth;
mod chat;
mod config;
mod doctor;
mod events;
mod mail;

pub use ask::run_ask;
pub use auth::run_auth;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use events::run_events;
pub use mail::run_mail;
