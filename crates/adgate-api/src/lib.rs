//! HTTP API for Adgate
//!
//! REST endpoints over a [`adgate_core::Directory`], guarded by HMAC
//! signed-request verification.

pub mod body;
pub mod metrics;
pub mod middleware;
pub mod respond;
pub mod routes;
pub mod server;

pub use crate::metrics::MetricsRecorder;
pub use respond::{normalize, Failure, OperationResult, Reply};
pub use server::{build_router, AppState, GatewayServer};
