//! Core types for Adgate

mod entry;
mod input;

pub use entry::*;
pub use input::*;
