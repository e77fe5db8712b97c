pub mod admin;
pub mod apps;
pub mod health;
pub mod index;
pub mod session;
