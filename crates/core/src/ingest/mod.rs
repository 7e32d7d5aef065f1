//! Synchronization engine.
//!
//! Walks remote listings page by page, reconciles every record into the
//! catalog store, and commits each page as one unit of work.

pub mod orchestrator;
pub mod reconcile;
pub mod unit_of_work;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{IngestOptions, Ingestor};
pub use reconcile::{CollectionRef, PackageRef};
pub use unit_of_work::{Change, UnitOfWork};
pub use walker::{CursorWalker, FIRST_CURSOR, GranuleListing, Listing, PackageListing, continuation_token};
