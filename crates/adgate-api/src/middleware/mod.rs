//! Request middleware

pub mod auth;

pub use auth::hmac_auth;
