//! Persistence backend abstraction for the issue collection.
//!
//! One capability set, two interchangeable variants:
//!
//! - **Local**: the whole collection lives in a key/value slot store
//!   ([`LocalStore`]); every operation is a synchronous-in-spirit
//!   read-modify-write of one serialized blob.
//! - **Remote**: a managed row store reached through the [`RowClient`]
//!   boundary ([`RemoteStore`]); operations translate to row mutations and
//!   a change-notification stream signals when to re-fetch.
//!
//! The variant is selected once per session (see [`crate::sync`]) and used
//! polymorphically through `Box<dyn IssueStore>`; there is no per-call
//! branching on the active mode.

use crate::domain::{Issue, IssueId, IssueUpdate, NewIssue, UserId};
use crate::error::Result;
use async_trait::async_trait;
use snagboard_kv::SlotStore;
use std::fmt;
use std::sync::Arc;

pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::{
    ChangeEvent, InProcessRowClient, IssueRow, IssueRowPatch, NewIssueRow, RemoteStore, RowClient,
};

/// Core storage contract for the issue collection.
///
/// Semantics are identical regardless of variant; the synchronization
/// service relies on that to keep its mirror-patching logic
/// variant-agnostic.
///
/// # Error Handling
///
/// - `list` never fails for the local variant; the remote variant may fail
///   with `Error::BackendUnavailable` on connectivity loss.
/// - Mutations targeting an unknown id return `Error::IssueNotFound`,
///   except `delete`, which reports absence as `Ok(false)`.
/// - Benign upvote no-ops (identity already in the requested end state)
///   are `Ok(false)`, never errors, and perform no mutation.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Return the full current collection, newest first.
    async fn list(&self) -> Result<Vec<Issue>>;

    /// Create a new issue authored by `author`.
    ///
    /// The backend assigns the id and submission timestamp; the issue
    /// starts `Pending` with no upvotes.
    async fn create(&mut self, data: NewIssue, author: &UserId) -> Result<Issue>;

    /// Apply the present fields of `patch` to an existing issue and return
    /// the updated record.
    ///
    /// # Errors
    ///
    /// Returns `Error::IssueNotFound` if the id is unknown.
    async fn update(&mut self, id: &IssueId, patch: IssueUpdate) -> Result<Issue>;

    /// Delete an issue.
    ///
    /// Returns `true` if a record existed and was removed, `false` if the
    /// id was unknown.
    async fn delete(&mut self, id: &IssueId) -> Result<bool>;

    /// Add `user` to the issue's upvote set.
    ///
    /// Returns `true` if the identity was newly added, `false` (no
    /// mutation) if it was already present.
    async fn add_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool>;

    /// Remove `user` from the issue's upvote set.
    ///
    /// Returns `true` if the identity was present and removed, `false` if
    /// it was already absent.
    async fn remove_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool>;
}

/// The backend variant active for a session.
#[derive(Clone)]
pub enum StoreBackend {
    /// Key/value-backed local persistence.
    Local(Arc<dyn SlotStore>),

    /// Managed remote row store.
    Remote(Arc<dyn RowClient>),
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Local(_) => f.write_str("StoreBackend::Local"),
            StoreBackend::Remote(_) => f.write_str("StoreBackend::Remote"),
        }
    }
}

/// Create a store instance for the given backend.
///
/// Returns a trait object usable polymorphically regardless of variant.
/// Opening the local variant seeds the sample collection on first use.
///
/// # Errors
///
/// Returns an error if the local slot store cannot be read or the seed
/// write fails.
pub async fn create_store(backend: StoreBackend) -> Result<Box<dyn IssueStore>> {
    match backend {
        StoreBackend::Local(slots) => Ok(Box::new(LocalStore::open(slots).await?)),
        StoreBackend::Remote(client) => Ok(Box::new(RemoteStore::new(client))),
    }
}
