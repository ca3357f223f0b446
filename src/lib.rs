//! # bibmerge
//!
//! Bibliographic retrieval from Google Books and Google Scholar (via SerpAPI),
//! merged into deduplicated CSV tables.
//!
//! ## Modules
//!
//! - [`books`] - Google Books client and volume normalizer
//! - [`scholar`] - SerpAPI Google Scholar client and result normalizer
//! - [`record`] - Unified record schema and table columns
//! - [`store`] - Append-only CSV tables with title deduplication
//! - [`pipeline`] - Runs both providers and merges the results
//! - [`credentials`] - API key persistence
//! - [`server`] - HTTP front end
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bibmerge::{credentials::CredentialStore, pipeline::Retriever};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = CredentialStore::default().load();
//!     let retriever = Retriever::new(Duration::from_secs(30))?;
//!     let outcome = retriever
//!         .retrieve(&credentials, "biology", 10, Path::new("combined_data.csv"))
//!         .await?;
//!     println!("{}", outcome.message());
//!     Ok(())
//! }
//! ```

pub mod books;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod scholar;
pub mod server;
pub mod store;

pub use error::{BibmergeError, Result};
pub use record::{Source, UnifiedRecord};
