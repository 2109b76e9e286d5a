//! og-preview: resolve submitted URLs to their Open Graph preview image.
//!
//! - **db**: SQLite record store of submitted URLs and their status
//! - **cache**: TTL cache (Redis or in-process) of resolved image URLs
//! - **fetcher**: single-shot page fetch and `og:image` extraction
//! - **resolver**: cache → store → fetch workflow and history paging
//! - **routes**: axum JSON API over the resolver

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod resolver;
pub mod routes;

pub use config::Config;
pub use resolver::Resolver;
pub use routes::{router, AppState};
