//! Remote transport for govsync.
//!
//! This crate provides the GovInfo REST API client that the ingestion engine
//! in `govsync-core` drives through its `Transport` trait.

pub mod govinfo;

pub use govinfo::{Endpoints, GovInfoClient, GovInfoConfig, GovInfoError, PublishedFilter, SearchRequest};
