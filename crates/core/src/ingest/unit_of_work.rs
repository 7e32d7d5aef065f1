//! Batched changes committed atomically.

use super::reconcile::{self, CollectionRef, PackageRef};
use crate::Error;
use crate::models::{GranuleRecord, PackageRecord};
use crate::store::CatalogDb;

/// One pending reconciliation.
#[derive(Debug, Clone)]
pub enum Change {
    Package { parent: CollectionRef, record: PackageRecord },
    Granule { parent: PackageRef, record: GranuleRecord },
}

/// Changes accumulated during one page of a run.
///
/// Nothing reaches the database until [`CatalogDb::commit`] applies the
/// whole batch in a single transaction; a batch that fails part-way leaves
/// no trace.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    changes: Vec<Change>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn push_package(&mut self, parent: &CollectionRef, record: PackageRecord) {
        self.push(Change::Package { parent: parent.clone(), record });
    }

    pub fn push_granule(&mut self, parent: &PackageRef, record: GranuleRecord) {
        self.push(Change::Granule { parent: parent.clone(), record });
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl CatalogDb {
    /// Apply every change in `work` inside one transaction.
    ///
    /// Returns the number of records applied. An empty batch does not touch
    /// the database.
    pub async fn commit(&self, work: UnitOfWork) -> Result<usize, Error> {
        if work.is_empty() {
            return Ok(0);
        }

        let applied = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for change in &work.changes {
                    match change {
                        Change::Package { parent, record } => reconcile::merge_package(&tx, parent, record)?,
                        Change::Granule { parent, record } => reconcile::merge_granule(&tx, parent, record)?,
                    }
                }
                tx.commit()?;
                Ok(work.changes.len())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(records = applied, "unit of work committed");
        Ok(applied)
    }
}
