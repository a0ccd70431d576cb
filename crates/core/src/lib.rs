pub mod auth;
pub mod config;
pub mod error;
pub mod push;
pub mod sensors;
pub mod types;
