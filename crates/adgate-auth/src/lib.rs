//! Request authentication for Adgate

pub mod signature;

pub use signature::{content_hash, AuthError, HmacAuth, SignedRequest};
