//! Cloudflare API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Main client composing the resource APIs
//! - [`envelope`] - The `{success, errors, messages, result}` response wrapper
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use cfapi::{Client, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = Client::new(&Config::load())?;
//!     let zones = client.zones().list(&Default::default(), CancellationToken::new()).collect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod envelope;
pub mod http;
