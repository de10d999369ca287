//! Route handlers
//!
//! Each handler makes exactly one directory call and returns a
//! [`Reply`](crate::respond::Reply).

pub mod groups;
pub mod ous;
pub mod search;
pub mod status;
pub mod users;

use adgate_core::QueryOptions;
use axum::extract::RawQuery;

/// Translate the raw query string
pub(crate) fn query_options(RawQuery(raw): RawQuery) -> QueryOptions {
    QueryOptions::parse(raw.as_deref())
}
