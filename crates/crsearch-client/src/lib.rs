//! Search backend client for the content search indexer.
//!
//! This crate provides:
//! - [`SearchBackend`]: the operations the indexer needs from a search engine
//! - [`HttpBackend`]: implementation for Elasticsearch-compatible HTTP servers
//! - [`InMemoryBackend`]: simulator with the same observable semantics, for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use crsearch_client::{HttpBackend, HttpBackendConfig, SearchBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new(HttpBackendConfig::new("http://localhost:9200"))?;
//!     let live = backend.aliased_indices("crsearch").await?;
//!     println!("live indices: {:?}", live);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod memory;

pub use backend::{DocumentHit, ScrollPage, SearchBackend};
pub use error::BackendError;
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::InMemoryBackend;
