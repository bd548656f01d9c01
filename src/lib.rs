// Toggl Plan API client - library root

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;

pub use auth::Credentials;
pub use client::PlanClient;
pub use config::{ClientConfig, RetryPolicy};
pub use error::ApiError;
