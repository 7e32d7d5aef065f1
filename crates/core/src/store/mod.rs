//! SQLite-backed catalog store.
//!
//! This module provides persistent storage for collections, packages,
//! granules and memoized search results, with async access via
//! tokio-rusqlite. It supports:
//!
//! - Lookup by natural key (absence is `None`, never an error)
//! - Upserts keyed on natural identifiers
//! - Cascading deletes from collection to package to granule
//! - Content-addressed search cache with lazy TTL expiry
//! - Automatic schema migrations

mod codec;
pub mod collections;
pub mod connection;
pub mod granules;
pub mod hash;
pub mod migrations;
pub mod packages;
pub mod search;

pub(crate) use codec::{blob_text, opt_ts, ts};

pub use connection::CatalogDb;
pub use hash::query_hash;
pub use search::cached_search;
