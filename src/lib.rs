// Marketplace social graph - follow relationships, reviews and profile views

// HTTP surface and shared state
pub mod api;
pub mod app_state;
pub mod config;

// Storage, caching, auth and viewer infrastructure
pub mod infrastructure;

// Document models and business services
pub mod models;
pub mod services;

// Common utilities
pub mod error;
pub mod data_seeder;

// Re-exports for convenience
pub use error::{AppError, AppResult};
