//! cfapi - typed client for the Cloudflare administrative API
//!
//! Covers zones, DNS records, accounts, members, roles, D1 databases and R2
//! object storage. List endpoints are exposed as lazy [`Paginated`]
//! sequences; R2 calls report billable [`Metrics`]; multi-request operations
//! that fail partway keep the data and metrics accrued before the failure.
//!
//! # Module Structure
//!
//! - [`api`] - HTTP client, response envelope and the [`Client`] facade
//! - [`engine`] - Metrics, pagination and batch execution
//! - [`resource`] - Per-family endpoints and DTOs
//! - [`config`] - Persistent configuration with environment overrides
//! - [`error`] - Error types

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod resource;
pub mod types;

pub use api::client::{Client, Session};
pub use config::Config;
pub use engine::{BatchExecutor, Listing, Metered, Metrics, Paginated, TotalPages};
pub use error::{ApiFailure, BatchError, BatchFailure, Error, ListError, ListFailure};
pub use tokio_util::sync::CancellationToken;
