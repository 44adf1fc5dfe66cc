//! Core abstractions shared by the edge cache coordinator.
//!
//! This crate provides the host-facing collaborators:
//! - `RequestContext` - Typed request parameters (method, query, headers, cookies)
//! - `Response` - Status and headers of the response being built
//! - `CacheControlConfig` - Coordinator configuration and its loader
//! - `ConfigError` - Configuration failures

mod config;
mod context;
mod error;
mod response;

pub use config::*;
pub use context::*;
pub use error::*;
pub use response::*;

pub use http::{Method, StatusCode};
