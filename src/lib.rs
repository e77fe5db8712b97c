pub mod app;
pub mod auth;
pub mod authz;
pub mod config;
pub mod errors;
pub mod events;
pub mod jwt;
pub mod models;
pub mod registry;
pub mod routes;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{create_app, AppState, Gateway};
