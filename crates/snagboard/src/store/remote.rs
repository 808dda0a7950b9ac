//! Remote row-store backend.
//!
//! Implements [`IssueStore`] against a managed real-time row store reached
//! through the [`RowClient`] boundary trait. Issue operations translate
//! directly to row mutations; a collection-level change-notification
//! stream (carrying no row data) tells subscribers to re-fetch.
//!
//! The remote row shape is snake_case ([`IssueRow`]); the in-memory mirror
//! shape is camelCase ([`Issue`]). The mapping layer lives here and is
//! applied in both directions at the boundary.
//!
//! # Upvote race
//!
//! Upvote operations are not atomic server-side set mutations: they
//! fetch the current upvote list, compute the new set, and write it back.
//! Two upvotes landing concurrently on the same issue can lose one write.
//! This limitation is accepted (it matches the original system) and
//! mitigated client-side by a membership check before the write and by
//! deduplicating the optimistic merge in the synchronization layer.

use crate::domain::{
    Issue, IssueId, IssueStatus, IssueUpdate, NewIssue, UserId, sort_newest_first,
};
use crate::error::{Error, Result};
use crate::id_generation::IdGenerator;
use crate::store::IssueStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

/// A persisted issue row, in the remote store's snake_case shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRow {
    /// Row id, assigned by the row store on insert.
    pub id: String,

    /// Issue title.
    pub title: String,

    /// Issue description.
    pub description: String,

    /// Email of the submitting member.
    pub submitted_by: String,

    /// Submission timestamp.
    pub date_submitted: DateTime<Utc>,

    /// Upvoting identities, stored as a text array.
    pub upvotes: Vec<String>,

    /// Status text.
    pub status: IssueStatus,
}

impl From<IssueRow> for Issue {
    fn from(row: IssueRow) -> Self {
        Issue {
            id: IssueId::new(row.id),
            title: row.title,
            description: row.description,
            submitted_by: UserId::new(row.submitted_by),
            date_submitted: row.date_submitted,
            upvotes: row.upvotes.into_iter().map(UserId::new).collect(),
            status: row.status,
        }
    }
}

/// Insert payload for a new issue row; the id is store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssueRow {
    /// Issue title.
    pub title: String,

    /// Issue description.
    pub description: String,

    /// Email of the submitting member.
    pub submitted_by: String,

    /// Submission timestamp.
    pub date_submitted: DateTime<Utc>,

    /// Initial upvote set (empty at creation).
    pub upvotes: Vec<String>,

    /// Initial status (`Pending` at creation).
    pub status: IssueStatus,
}

/// Partial row update; only present fields are written.
#[derive(Debug, Clone, Default)]
pub struct IssueRowPatch {
    /// New title, if updating.
    pub title: Option<String>,

    /// New description, if updating.
    pub description: Option<String>,

    /// New status, if updating.
    pub status: Option<IssueStatus>,

    /// Full replacement upvote set, if updating. Only the upvote
    /// operations write this field.
    pub upvotes: Option<Vec<String>>,
}

/// A change notification from the row store.
///
/// Carries no row data; any event means the collection changed and the
/// subscriber should re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A row was inserted.
    Insert,

    /// A row was updated.
    Update,

    /// A row was deleted.
    Delete,
}

/// Boundary to the managed row store.
///
/// Implementations must be `Send + Sync`; the store is shared behind an
/// `Arc` between the remote store and the subscription listener.
///
/// # Errors
///
/// Any method may fail with `Error::BackendUnavailable` on connectivity
/// loss; callers treat that as a rejected operation and apply no local
/// state change.
#[async_trait]
pub trait RowClient: Send + Sync {
    /// Fetch all rows of the issue collection.
    async fn fetch_rows(&self) -> Result<Vec<IssueRow>>;

    /// Insert a new row, returning it with its assigned id.
    async fn insert_row(&self, row: NewIssueRow) -> Result<IssueRow>;

    /// Apply a partial update to a row.
    ///
    /// Returns the updated row, or `None` if the id is unknown.
    async fn update_row(&self, id: &str, patch: IssueRowPatch) -> Result<Option<IssueRow>>;

    /// Delete a row. Returns `true` if it existed.
    async fn delete_row(&self, id: &str) -> Result<bool>;

    /// Fetch only the upvote list of a row, or `None` if the id is unknown.
    async fn fetch_upvotes(&self, id: &str) -> Result<Option<Vec<String>>>;

    /// Subscribe to collection-level change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Remote store over a [`RowClient`].
pub struct RemoteStore {
    client: Arc<dyn RowClient>,
}

impl RemoteStore {
    /// Create a remote store over the given client.
    pub fn new(client: Arc<dyn RowClient>) -> Self {
        Self { client }
    }

    /// Subscribe to the underlying change-notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.client.subscribe()
    }
}

#[async_trait]
impl IssueStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Issue>> {
        let rows = self.client.fetch_rows().await?;
        let mut issues: Vec<Issue> = rows.into_iter().map(Issue::from).collect();
        sort_newest_first(&mut issues);
        Ok(issues)
    }

    async fn create(&mut self, data: NewIssue, author: &UserId) -> Result<Issue> {
        let row = self
            .client
            .insert_row(NewIssueRow {
                title: data.title,
                description: data.description,
                submitted_by: author.as_str().to_string(),
                date_submitted: Utc::now(),
                upvotes: Vec::new(),
                status: IssueStatus::Pending,
            })
            .await?;
        Ok(row.into())
    }

    async fn update(&mut self, id: &IssueId, patch: IssueUpdate) -> Result<Issue> {
        let row = self
            .client
            .update_row(
                id.as_str(),
                IssueRowPatch {
                    title: patch.title,
                    description: patch.description,
                    status: patch.status,
                    upvotes: None,
                },
            )
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;
        Ok(row.into())
    }

    async fn delete(&mut self, id: &IssueId) -> Result<bool> {
        self.client.delete_row(id.as_str()).await
    }

    async fn add_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool> {
        let upvotes = self
            .client
            .fetch_upvotes(id.as_str())
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;

        if upvotes.iter().any(|u| u == user.as_str()) {
            return Ok(false);
        }

        // Read-modify-write: a concurrent upvote between the fetch above
        // and this write loses one identity. Accepted limitation.
        let mut updated = upvotes;
        updated.push(user.as_str().to_string());

        self.client
            .update_row(
                id.as_str(),
                IssueRowPatch {
                    upvotes: Some(updated),
                    ..IssueRowPatch::default()
                },
            )
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;
        Ok(true)
    }

    async fn remove_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool> {
        let upvotes = self
            .client
            .fetch_upvotes(id.as_str())
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;

        if !upvotes.iter().any(|u| u == user.as_str()) {
            return Ok(false);
        }

        let updated: Vec<String> = upvotes.into_iter().filter(|u| u != user.as_str()).collect();

        self.client
            .update_row(
                id.as_str(),
                IssueRowPatch {
                    upvotes: Some(updated),
                    ..IssueRowPatch::default()
                },
            )
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;
        Ok(true)
    }
}

/// Capacity of the in-process change channel. Events carry no data, and a
/// lagged receiver simply re-fetches, so a small buffer suffices.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

struct InProcessRows {
    rows: Vec<IssueRow>,
    ids: IdGenerator,
}

/// In-memory [`RowClient`] with a working change-notification channel.
///
/// Stands in for the managed row store in tests and demos. Rows live
/// behind a mutex; every successful mutation broadcasts a [`ChangeEvent`]
/// to all subscribers, exactly like the managed store's collection-level
/// subscription.
pub struct InProcessRowClient {
    inner: Mutex<InProcessRows>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl InProcessRowClient {
    /// Create an empty in-process row store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(InProcessRows {
                rows: Vec::new(),
                ids: IdGenerator::new(),
            }),
            changes,
        }
    }

    fn notify(&self, event: ChangeEvent) {
        // Nobody listening is fine; the send result only reports that.
        let _ = self.changes.send(event);
    }
}

impl Default for InProcessRowClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowClient for InProcessRowClient {
    async fn fetch_rows(&self) -> Result<Vec<IssueRow>> {
        Ok(self.inner.lock().await.rows.clone())
    }

    async fn insert_row(&self, row: NewIssueRow) -> Result<IssueRow> {
        let inserted = {
            let mut inner = self.inner.lock().await;
            let inserted = IssueRow {
                id: inner.ids.next_id().0,
                title: row.title,
                description: row.description,
                submitted_by: row.submitted_by,
                date_submitted: row.date_submitted,
                upvotes: row.upvotes,
                status: row.status,
            };
            inner.rows.push(inserted.clone());
            inserted
        };
        self.notify(ChangeEvent::Insert);
        Ok(inserted)
    }

    async fn update_row(&self, id: &str, patch: IssueRowPatch) -> Result<Option<IssueRow>> {
        let updated = {
            let mut inner = self.inner.lock().await;
            let Some(row) = inner.rows.iter_mut().find(|row| row.id == id) else {
                return Ok(None);
            };

            if let Some(title) = patch.title {
                row.title = title;
            }
            if let Some(description) = patch.description {
                row.description = description;
            }
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(upvotes) = patch.upvotes {
                row.upvotes = upvotes;
            }
            row.clone()
        };
        self.notify(ChangeEvent::Update);
        Ok(Some(updated))
    }

    async fn delete_row(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut inner = self.inner.lock().await;
            let before = inner.rows.len();
            inner.rows.retain(|row| row.id != id);
            inner.rows.len() != before
        };
        if removed {
            self.notify(ChangeEvent::Delete);
        }
        Ok(removed)
    }

    async fn fetch_upvotes(&self, id: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .inner
            .lock()
            .await
            .rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.upvotes.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
