//! Infrastructure layer: storage, configuration, file storage, and the
//! resource handlers that join the store with the authorization policy.

pub mod config;
pub mod handlers;
pub mod query;
pub mod store;
pub mod uploads;
