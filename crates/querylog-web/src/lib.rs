//! querylog-web — axum integration for the query log.
//!
//! Every request handled behind [`capture_queries`] is one unit of work: queries
//! reported through `querylog_core::scope::report` while the request runs are
//! flushed to the daily log when the response is ready.

pub mod middleware;

pub use middleware::{capture_queries, request_context, with_query_log};
