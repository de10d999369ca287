//! Cryptography utilities for Adgate

pub mod hash;

pub use hash::*;
