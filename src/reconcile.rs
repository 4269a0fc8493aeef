// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record store reconciliation.
//!
//! Reconciliation diffs a freshly collected set of records against the
//! record store, then issues the create, update, and delete mutations that
//! make the store match the collection exactly. It has __full-replace__
//! semantics: any stored record that was not collected again is deleted.
//!
//! Records are matched by identifier. A matched record is only updated when
//! it compares unequal to its stored counterpart, which for
//! [`FileRecord`](crate::record::file::FileRecord) means its modification
//! time moved.
//!
//! Reconciliation is split into a [`plan`] that never mutates the store,
//! and an [`apply`] that issues every planned mutation before committing
//! once. Callers get a chance to inspect the plan in between, e.g., to ask
//! the user before deleting anything.

use crate::{
    collect::CollectionResult,
    record::{file::FileRecord, Record, RecordId},
    store::{RecordStore, StoreError},
};

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};
use tracing::{debug, info, instrument, warn};

/// Partition of records produced by reconciliation.
///
/// # Invariant
///
/// - Partitions are pairwise disjoint by identifier.
/// - Union of partitions covers every stored and every incoming identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation<R>
where
    R: Record,
{
    /// Incoming records absent from the store.
    pub created: Vec<R>,

    /// Incoming records that differ from their stored counterpart.
    pub updated: Vec<R>,

    /// Stored records absent from the incoming set.
    pub deleted: Vec<R>,

    /// Incoming records equal to their stored counterpart.
    pub unchanged: Vec<R>,
}

impl<R> Default for Reconciliation<R>
where
    R: Record,
{
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

impl<R> Reconciliation<R>
where
    R: Record,
{
    /// Check if applying would mutate the store.
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }
}

/// Compute reconciliation between store and incoming records.
///
/// Does not mutate the store. Incoming records sharing an identifier are
/// collapsed, keeping the last one.
///
/// # Errors
///
/// - Return [`ReconcileError::Store`] if stored records cannot be read.
pub fn plan<R, S>(store: &S, incoming: impl IntoIterator<Item = R>) -> Result<Reconciliation<R>>
where
    R: Record,
    S: RecordStore<R>,
{
    plan_within(store, incoming, |_| true)
}

/// Compute reconciliation against the stored records inside a scope.
///
/// Stored records outside the scope are neither compared nor deleted, e.g.,
/// when only part of the notes tree was collected.
///
/// # Errors
///
/// - Return [`ReconcileError::Store`] if stored records cannot be read.
#[instrument(skip(store, incoming, scope), level = "debug")]
pub fn plan_within<R, S, F>(
    store: &S,
    incoming: impl IntoIterator<Item = R>,
    scope: F,
) -> Result<Reconciliation<R>>
where
    R: Record,
    S: RecordStore<R>,
    F: Fn(&R) -> bool,
{
    let mut stored = store
        .find_all()?
        .into_iter()
        .filter(|record| scope(record))
        .map(|record| (record.id(), record))
        .collect::<BTreeMap<RecordId, R>>();

    let mut incoming = incoming.into_iter().collect::<Vec<_>>();
    let mut seen = HashSet::new();
    incoming.reverse();
    incoming.retain(|record| seen.insert(record.id()));
    incoming.reverse();

    let mut plan = Reconciliation::default();
    for record in incoming {
        match stored.remove(&record.id()) {
            Some(existing) if existing == record => plan.unchanged.push(record),
            Some(_) => plan.updated.push(record),
            None => plan.created.push(record),
        }
    }

    // INVARIANT: Whatever was not seen again gets deleted.
    plan.deleted.extend(stored.into_values());

    debug!(
        "planned {} created, {} updated, {} deleted, {} unchanged {} records",
        plan.created.len(),
        plan.updated.len(),
        plan.deleted.len(),
        plan.unchanged.len(),
        R::TYPE_NAME
    );

    Ok(plan)
}

/// Plan reconciliation of records collected from location in notes tree.
///
/// Collecting the whole tree replaces the store entirely. Collecting a
/// subtree only replaces stored records under that subtree.
///
/// # Errors
///
/// - Return [`ReconcileError::Store`] if stored records cannot be read.
pub fn plan_collection<S>(
    store: &S,
    records: Vec<FileRecord>,
    root: &Path,
    location: &Path,
) -> Result<Reconciliation<FileRecord>>
where
    S: RecordStore<FileRecord>,
{
    if location == root {
        plan(store, records)
    } else {
        plan_within(store, records, |record| record.path().starts_with(location))
    }
}

/// Issue every mutation of a reconciliation, then commit once.
///
/// # Errors
///
/// - Return [`ReconcileError::Store`] if a mutation or the commit fails.
///   The store is rolled back to its last commit in that case.
#[instrument(skip(store, plan), level = "debug")]
pub fn apply<R, S>(store: &mut S, plan: &Reconciliation<R>) -> Result<()>
where
    R: Record,
    S: RecordStore<R>,
{
    if let Err(error) = issue(store, plan) {
        warn!("failed to apply reconciliation, rolling back: {error}");
        store.rollback()?;
        return Err(error.into());
    }

    info!(
        "saved {}, updated {}, deleted {} {} records",
        plan.created.len(),
        plan.updated.len(),
        plan.deleted.len(),
        R::TYPE_NAME
    );

    Ok(())
}

fn issue<R, S>(store: &mut S, plan: &Reconciliation<R>) -> Result<(), StoreError>
where
    R: Record,
    S: RecordStore<R>,
{
    for record in &plan.created {
        store.insert(record.clone())?;
    }

    for record in &plan.updated {
        store.update_by_id(record.id(), record.clone())?;
    }

    for record in &plan.deleted {
        store.delete_by_id(record.id())?;
    }

    store.commit()
}

/// Plan and apply reconciliation in one go.
///
/// # Errors
///
/// - Return [`ReconcileError::Store`] if the store fails.
pub fn reconcile<R, S>(
    store: &mut S,
    incoming: impl IntoIterator<Item = R>,
) -> Result<Reconciliation<R>>
where
    R: Record,
    S: RecordStore<R>,
{
    let plan = plan(store, incoming)?;
    apply(store, &plan)?;

    Ok(plan)
}

/// Reconcile store with the records of a collection.
///
/// # Errors
///
/// - Return [`ReconcileError::Precondition`] if the collection has errors.
///   The store is left untouched.
/// - Return [`ReconcileError::Store`] if the store fails.
pub fn reconcile_collection<S>(
    store: &mut S,
    result: CollectionResult,
) -> Result<Reconciliation<FileRecord>>
where
    S: RecordStore<FileRecord>,
{
    if !result.is_clean() {
        return Err(ReconcileError::Precondition {
            errors: result.errors().len(),
        });
    }

    reconcile(store, result.into_records())
}

/// Reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Collection with errors cannot be reconciled.
    #[error("refusing to reconcile a collection with {errors} errors")]
    Precondition { errors: usize },

    /// Record store fails.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Friendly result alias :3
type Result<T, E = ReconcileError> = std::result::Result<T, E>;
