//! HTTP API: router, middleware, and request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;
pub mod rate_limit;
pub mod sanitize;
