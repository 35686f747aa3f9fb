//! Sequence Server
//!
//! Authenticated lookup service for pre-recorded tactical video sequences:
//! - Static, validated catalog of formation combinations
//! - Dependent-selection catalog view for the web client
//! - Synchronous job resolution with per-job signed access grants
//! - Grant-checked, cache-defeating video delivery

pub mod assets;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod jobs;
pub mod resolver;
pub mod server;
pub mod utils;

// Re-exports for convenience
pub use catalog::{build_catalog, CatalogIndex, CatalogView};
pub use config::ServerConfig;
pub use error::{CatalogError, ServiceError};
pub use resolver::SelectionResolver;
