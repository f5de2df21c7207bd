pub mod admin;
pub mod auth;
pub mod error;
pub mod posts;
