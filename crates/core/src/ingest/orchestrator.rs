//! Ingestion runs.
//!
//! A run walks one remote listing page by page. Each page becomes one
//! [`UnitOfWork`] committed before the next page is requested, so a run
//! interrupted at page N keeps pages 1..N-1 and a rerun converges on the
//! same state. A record whose detail fetch fails is still stored from its
//! listing data.

use async_trait::async_trait;
use tracing::Instrument;

use super::reconcile::{CollectionRef, PackageRef};
use super::unit_of_work::{Change, UnitOfWork};
use super::walker::{CursorWalker, GranuleListing, Listing, PackageListing};
use crate::Error;
use crate::models::{DEFAULT_PAGE_SIZE, GranuleBasic, GranuleRecord, PackageBasic, PackageRecord, PackageWindow};
use crate::store::CatalogDb;
use crate::transport::Transport;

/// Knobs for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Records requested per listing page.
    pub page_size: u32,
    /// Stop after this many pages. `None` walks the whole listing.
    pub max_pages: Option<usize>,
    /// Fetch the full detail of every listed record.
    pub fetch_details: bool,
    /// Resume from a continuation token instead of the first page.
    pub start_cursor: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, max_pages: None, fetch_details: false, start_cursor: None }
    }
}

impl IngestOptions {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_details(mut self) -> Self {
        self.fetch_details = true;
        self
    }

    pub fn starting_at(mut self, cursor: impl Into<String>) -> Self {
        self.start_cursor = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Paging,
    Reconciling,
    Committing,
    Done,
    Faulted,
}

fn enter(state: &mut RunState, next: RunState) {
    tracing::trace!(from = ?*state, to = ?next, "run state");
    *state = next;
}

/// Resolves listed records into changes under one parent.
#[async_trait]
trait Scope: Send + Sync {
    type Record: Send;

    /// Build the change for one record. The flag is set when a requested
    /// detail fetch failed and the basic record was used instead.
    async fn resolve(&self, record: Self::Record, fetch_details: bool) -> (Change, bool);
}

struct PackageScope<'a, T: ?Sized> {
    transport: &'a T,
    parent: CollectionRef,
}

#[async_trait]
impl<T: Transport + ?Sized> Scope for PackageScope<'_, T> {
    type Record = PackageBasic;

    async fn resolve(&self, basic: PackageBasic, fetch_details: bool) -> (Change, bool) {
        let parent = self.parent.clone();
        if !fetch_details {
            return (Change::Package { parent, record: PackageRecord::Basic(basic) }, false);
        }

        match self.transport.fetch_package_detail(&basic.package_id).await {
            Ok(mut detail) => {
                if detail.last_modified.is_none() {
                    detail.last_modified = Some(basic.last_modified);
                }
                (Change::Package { parent, record: PackageRecord::Full(detail) }, false)
            }
            Err(e) => {
                tracing::warn!(package_id = %basic.package_id, error = %e, "detail fetch failed, storing listing record");
                (Change::Package { parent, record: PackageRecord::Basic(basic) }, true)
            }
        }
    }
}

struct GranuleScope<'a, T: ?Sized> {
    transport: &'a T,
    parent: PackageRef,
}

#[async_trait]
impl<T: Transport + ?Sized> Scope for GranuleScope<'_, T> {
    type Record = GranuleBasic;

    async fn resolve(&self, basic: GranuleBasic, fetch_details: bool) -> (Change, bool) {
        let parent = self.parent.clone();
        if !fetch_details {
            return (Change::Granule { parent, record: GranuleRecord::Basic(basic) }, false);
        }

        match self.transport.fetch_granule_detail(&parent.package_id, &basic.granule_id).await {
            Ok(mut detail) => {
                if detail.last_modified.is_none() {
                    detail.last_modified = basic.last_modified;
                }
                (Change::Granule { parent, record: GranuleRecord::Full(detail) }, false)
            }
            Err(e) => {
                tracing::warn!(granule_id = %basic.granule_id, error = %e, "detail fetch failed, storing listing record");
                (Change::Granule { parent, record: GranuleRecord::Basic(basic) }, true)
            }
        }
    }
}

/// Drives ingestion runs against one store and one transport.
pub struct Ingestor<'a, T: ?Sized> {
    db: &'a CatalogDb,
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> Ingestor<'a, T> {
    pub fn new(db: &'a CatalogDb, transport: &'a T) -> Self {
        Self { db, transport }
    }

    /// Fetch the collection catalog and upsert every entry.
    ///
    /// Returns the number of collections stored.
    pub async fn ingest_collections(&self) -> Result<usize, Error> {
        let collections = self.transport.list_collections().await?;
        let count = self.db.upsert_collections(collections).await?;
        tracing::info!(collections = count, "collections ingested");
        Ok(count)
    }

    /// Ingest the packages of one collection modified within `window`.
    ///
    /// Returns the number of records committed.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionNotFound` before any remote call if the
    /// collection is not stored. A listing failure aborts the run with
    /// `Error::Transport`; pages committed before it are kept.
    pub async fn ingest_collection_packages(
        &self, window: &PackageWindow, options: &IngestOptions,
    ) -> Result<usize, Error> {
        let collection = self
            .db
            .get_collection(&window.collection_code)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(window.collection_code.clone()))?;

        let span = tracing::info_span!("packages", collection = %window.collection_code);
        tracing::info!(parent: &span, start = %window.start, end = ?window.end, "package run started");

        let listing = PackageListing::new(self.transport, window.clone(), options.page_size);
        let scope = PackageScope { transport: self.transport, parent: collection.into() };
        self.drive(walker_for(listing, options), &scope, options).instrument(span).await
    }

    /// Ingest the granules of one stored package.
    ///
    /// # Errors
    ///
    /// Returns `Error::PackageNotFound` before any remote call if the package
    /// is not stored.
    pub async fn ingest_package_granules(&self, package_id: &str, options: &IngestOptions) -> Result<usize, Error> {
        let package = self
            .db
            .get_package(package_id)
            .await?
            .ok_or_else(|| Error::PackageNotFound(package_id.to_string()))?;

        let span = tracing::info_span!("granules", package_id);
        tracing::info!(parent: &span, "granule run started");

        let listing = GranuleListing::new(self.transport, package_id, options.page_size);
        let scope = GranuleScope { transport: self.transport, parent: package.into() };
        self.drive(walker_for(listing, options), &scope, options).instrument(span).await
    }

    async fn drive<L, S>(&self, mut walker: CursorWalker<L>, scope: &S, options: &IngestOptions) -> Result<usize, Error>
    where
        L: Listing,
        S: Scope<Record = L::Record>,
    {
        let mut state = RunState::Idle;
        let mut pending = UnitOfWork::new();
        let mut committed = 0;
        let mut fallbacks = 0;

        loop {
            if let Some(max) = options.max_pages
                && walker.pages_fetched() >= max
            {
                tracing::info!(max_pages = max, "page limit reached");
                break;
            }

            enter(&mut state, RunState::Paging);
            let page = match walker.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    enter(&mut state, RunState::Faulted);
                    tracing::error!(cursor = ?walker.cursor(), error = %e, "listing failed");
                    return Err(e.into());
                }
            };

            enter(&mut state, RunState::Reconciling);
            for record in page.records {
                let (change, fell_back) = scope.resolve(record, options.fetch_details).await;
                if fell_back {
                    fallbacks += 1;
                }
                pending.push(change);
            }

            enter(&mut state, RunState::Committing);
            committed += self.commit(&mut state, &mut pending).await?;
            tracing::info!(page = walker.pages_fetched(), committed, next_cursor = ?walker.cursor(), "page committed");
        }

        enter(&mut state, RunState::Committing);
        committed += self.commit(&mut state, &mut pending).await?;
        enter(&mut state, RunState::Done);
        tracing::info!(pages = walker.pages_fetched(), committed, fallbacks, "run finished");
        Ok(committed)
    }

    async fn commit(&self, state: &mut RunState, pending: &mut UnitOfWork) -> Result<usize, Error> {
        match self.db.commit(std::mem::take(pending)).await {
            Ok(applied) => Ok(applied),
            Err(e) => {
                enter(state, RunState::Faulted);
                Err(e)
            }
        }
    }
}

fn walker_for<L: Listing>(listing: L, options: &IngestOptions) -> CursorWalker<L> {
    match &options.start_cursor {
        Some(cursor) => CursorWalker::resume_at(listing, cursor.clone()),
        None => CursorWalker::new(listing),
    }
}
