//! salesforce-orm: an object mapper over a CRM's REST API.
//!
//! This is the library root that exports all modules.
//!
//! # Layers
//!
//! - **Connection**: authentication, API version, HTTP transport, caches
//! - **Model**: runtime metadata, records, query and search builders

// Allow some clippy lints that are stylistic and not critical
#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::len_without_is_empty)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod model;
pub mod value;

pub use auth::{Authenticator, PasswordAuth, StaticToken};
pub use cache::{CacheEntry, MemoryCache, ResponseCache};
pub use config::Config;
pub use connection::{ApiVersion, Connection};
pub use error::{OrmError, Result};
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
// Test helper for offline use; see `http::mock`.
pub use http::MockTransport;
pub use model::{
    Metadata, Query, QueryResult, Record, ResourceType, Search, SearchResult, SearchScope,
};
pub use value::Value;
