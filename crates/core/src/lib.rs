//! Core types and the synchronization engine for govsync.
//!
//! This crate provides:
//! - Catalog store with SQLite backend (collections, packages, granules)
//! - Query-result cache with lazy TTL expiry
//! - Cursor-walking ingestion engine over the remote catalog
//! - Unified error types and configuration structures

pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod store;
pub mod transport;

pub use config::AppConfig;
pub use error::Error;
pub use ingest::{CursorWalker, IngestOptions, Ingestor, UnitOfWork};
pub use store::{CatalogDb, cached_search};
pub use transport::{Transport, TransportError};
