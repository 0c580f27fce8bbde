// Mailferry Remote Infrastructure - HTTP adapter for the directory gateway

pub mod auth;
pub mod gateway;
pub mod types;

pub use auth::TokenManager;
pub use gateway::{HttpDirectoryGateway, RemoteConfig};
