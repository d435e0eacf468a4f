pub mod auth;
pub mod error;
pub mod mechanism;
pub mod network;
