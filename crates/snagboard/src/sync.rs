//! Issue synchronization service.
//!
//! Owns the authoritative in-memory mirror of the issue collection for one
//! session. On start it decides the backend variant exactly once (local
//! mode, or remote when a row client is configured), performs the initial
//! fetch, and - on the remote variant - spawns a listener that turns every
//! change notification into a full re-fetch and full mirror replacement.
//!
//! # Mutation protocol
//!
//! Every mutation follows the same shape: validate preconditions (an
//! authenticated identity where required) before any backend call, delegate
//! to the active backend, then patch the mirror. The local backend returns
//! authoritative state, applied directly; on the remote backend the patch
//! is *optimistic* - the caller sees the effect immediately, and the next
//! change-triggered re-fetch replaces the mirror wholesale (last-writer-wins
//! at the mirror level, never a merge). Any backend failure surfaces as a
//! rejected operation with the mirror left exactly as it was.
//!
//! # Reactive output
//!
//! Consumers subscribe through [`SyncService::feed`], a `watch` channel
//! publishing [`IssueFeed`] on every mirror change. Display ordering is
//! newest-first by submission time; any secondary sort (for example by
//! upvote count) is the presentation layer's business and never mutates
//! the stored order.

use crate::domain::{
    Issue, IssueId, IssueUpdate, NewIssue, UserAccount, UserId, dedup_upvotes, sort_newest_first,
};
use crate::error::{Error, Result};
use crate::store::{ChangeEvent, IssueStore, RowClient, StoreBackend, create_store};
use snagboard_kv::SlotStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

/// What the auth provider supplies: the signed-in member, if any, and
/// whether local (demo) mode is active.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    /// The signed-in member, if any. Mutations requiring an identity fail
    /// fast with `Error::Unauthenticated` when this is `None`.
    pub user: Option<UserAccount>,

    /// Whether local mode is active. Decided by the auth provider; fixed
    /// for the session.
    pub local_mode: bool,
}

/// Lifecycle of a synchronization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Backend not yet selected.
    Uninitialized,

    /// Initial fetch in progress.
    Loading,

    /// Mirror populated; mutations accepted.
    Ready,

    /// Backend misconfigured or initial fetch failed. The mirror stays
    /// empty and mutations fail fast with `Error::BackendUnavailable`.
    Unavailable,
}

/// The reactive value consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFeed {
    /// Current mirror contents, newest first.
    pub issues: Vec<Issue>,

    /// True while the initial fetch is in progress.
    pub loading: bool,
}

struct SyncInner {
    store: Option<Box<dyn IssueStore>>,
    mirror: Vec<Issue>,
    state: SessionState,
    listener: Option<JoinHandle<()>>,
}

impl SyncInner {
    fn ready_store_mut(&mut self) -> Result<&mut (dyn IssueStore + '_)> {
        if self.state != SessionState::Ready {
            return Err(Error::BackendUnavailable(format!(
                "session is {:?}, not ready",
                self.state
            )));
        }
        match self.store.as_deref_mut() {
            Some(store) => Ok(store),
            None => Err(Error::BackendUnavailable("no active backend".to_string())),
        }
    }
}

/// Decide the backend variant for a session. Called once at session start;
/// the decision is never re-evaluated.
///
/// Local mode wins outright. Otherwise a configured row client selects the
/// remote variant, and `None` means the session is misconfigured (no
/// backend at all), which [`SyncService::start`] surfaces as an
/// [`SessionState::Unavailable`] session.
pub fn select_backend(
    auth: &AuthState,
    remote: Option<Arc<dyn RowClient>>,
    slots: Arc<dyn SlotStore>,
) -> Option<StoreBackend> {
    if auth.local_mode {
        return Some(StoreBackend::Local(slots));
    }
    remote.map(StoreBackend::Remote)
}

/// Per-session synchronization service.
///
/// Created once per session via [`SyncService::start`]; torn down with
/// [`SyncService::shutdown`], which stops the change listener so no late
/// callback can mutate a stale mirror.
pub struct SyncService {
    inner: Mutex<SyncInner>,
    feed_tx: watch::Sender<IssueFeed>,
    user: Option<UserAccount>,
    live: Arc<AtomicBool>,
}

impl SyncService {
    /// Start a session: select the backend once, perform the initial
    /// fetch, and (remote variant) begin listening for change
    /// notifications.
    ///
    /// Never fails outright: a misconfigured backend or failed initial
    /// fetch yields a service in [`SessionState::Unavailable`], whose
    /// mutations reject fast, mirroring how the presentation layer shows a
    /// setup message rather than crashing.
    pub async fn start(
        auth: AuthState,
        remote: Option<Arc<dyn RowClient>>,
        slots: Arc<dyn SlotStore>,
    ) -> Arc<Self> {
        let (feed_tx, _) = watch::channel(IssueFeed {
            issues: Vec::new(),
            loading: true,
        });

        let service = Arc::new(Self {
            inner: Mutex::new(SyncInner {
                store: None,
                mirror: Vec::new(),
                state: SessionState::Uninitialized,
                listener: None,
            }),
            feed_tx,
            user: auth.user.clone(),
            live: Arc::new(AtomicBool::new(true)),
        });

        let Some(backend) = select_backend(&auth, remote, slots) else {
            tracing::warn!("no backend configured and local mode inactive");
            let mut inner = service.inner.lock().await;
            inner.state = SessionState::Unavailable;
            service.publish(&inner);
            drop(inner);
            return service;
        };
        tracing::debug!(?backend, "backend selected for session");

        // Subscribe before the first fetch so no change slips between the
        // snapshot and the stream.
        let changes = match &backend {
            StoreBackend::Remote(client) => Some(client.subscribe()),
            StoreBackend::Local(_) => None,
        };

        {
            let mut inner = service.inner.lock().await;
            inner.state = SessionState::Loading;

            match create_store(backend).await {
                Ok(store) => match store.list().await {
                    Ok(mut issues) => {
                        sort_newest_first(&mut issues);
                        inner.mirror = issues;
                        inner.store = Some(store);
                        inner.state = SessionState::Ready;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "initial issue fetch failed");
                        inner.state = SessionState::Unavailable;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "backend initialization failed");
                    inner.state = SessionState::Unavailable;
                }
            }
            service.publish(&inner);
        }

        if let Some(changes) = changes {
            SyncService::spawn_listener(&service, changes).await;
        }

        service
    }

    /// Subscribe to the reactive issue feed.
    pub fn feed(&self) -> watch::Receiver<IssueFeed> {
        self.feed_tx.subscribe()
    }

    /// Snapshot of the current mirror, newest first.
    pub fn issues(&self) -> Vec<Issue> {
        self.feed_tx.borrow().issues.clone()
    }

    /// Current session lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Create a new issue authored by the signed-in member.
    ///
    /// # Errors
    ///
    /// `Error::Unauthenticated` without a signed-in member (checked before
    /// any backend call); otherwise whatever the backend rejects with, in
    /// which case the mirror is unchanged.
    pub async fn create_issue(&self, data: NewIssue) -> Result<Issue> {
        let author = self.require_identity()?;

        let mut inner = self.inner.lock().await;
        let store = inner.ready_store_mut()?;
        let issue = store.create(data, &author).await?;

        inner.mirror.push(issue.clone());
        sort_newest_first(&mut inner.mirror);
        self.publish(&inner);
        Ok(issue)
    }

    /// Apply a partial update to an issue.
    pub async fn update_issue(&self, id: &IssueId, patch: IssueUpdate) -> Result<Issue> {
        let mut inner = self.inner.lock().await;
        let store = inner.ready_store_mut()?;
        let updated = store.update(id, patch).await?;

        if let Some(entry) = inner.mirror.iter_mut().find(|issue| &issue.id == id) {
            *entry = updated.clone();
        }
        self.publish(&inner);
        Ok(updated)
    }

    /// Delete an issue. Returns `true` if it existed.
    pub async fn delete_issue(&self, id: &IssueId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let store = inner.ready_store_mut()?;
        let removed = store.delete(id).await?;

        if removed {
            inner.mirror.retain(|issue| &issue.id != id);
            self.publish(&inner);
        }
        Ok(removed)
    }

    /// Upvote an issue as the signed-in member.
    ///
    /// Returns `false` (benign no-op) if the member already upvoted it.
    /// The optimistic mirror patch deduplicates identities so a concurrent
    /// remote upvote never double-counts before reconciliation.
    pub async fn upvote_issue(&self, id: &IssueId) -> Result<bool> {
        let user = self.require_identity()?;

        let mut inner = self.inner.lock().await;
        let store = inner.ready_store_mut()?;
        let added = store.add_upvote(id, &user).await?;

        if added {
            if let Some(entry) = inner.mirror.iter_mut().find(|issue| &issue.id == id) {
                entry.upvotes.push(user);
                dedup_upvotes(&mut entry.upvotes);
            }
            self.publish(&inner);
        }
        Ok(added)
    }

    /// Withdraw the signed-in member's upvote from an issue.
    ///
    /// Returns `false` (benign no-op) if no upvote was present.
    pub async fn remove_upvote(&self, id: &IssueId) -> Result<bool> {
        let user = self.require_identity()?;

        let mut inner = self.inner.lock().await;
        let store = inner.ready_store_mut()?;
        let removed = store.remove_upvote(id, &user).await?;

        if removed {
            if let Some(entry) = inner.mirror.iter_mut().find(|issue| &issue.id == id) {
                entry.upvotes.retain(|u| u != &user);
            }
            self.publish(&inner);
        }
        Ok(removed)
    }

    /// Tear the session down: stop the change listener and refuse any
    /// late callback. Must be called when the session ends so a leaked
    /// listener cannot mutate a stale mirror.
    pub async fn shutdown(&self) {
        self.live.store(false, Ordering::SeqCst);
        let mut inner = self.inner.lock().await;
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
        tracing::debug!("sync session shut down");
    }

    fn require_identity(&self) -> Result<UserId> {
        self.user
            .as_ref()
            .map(UserAccount::identity)
            .ok_or(Error::Unauthenticated)
    }

    fn publish(&self, inner: &SyncInner) {
        self.feed_tx.send_replace(IssueFeed {
            issues: inner.mirror.clone(),
            loading: inner.state == SessionState::Loading,
        });
    }

    /// Re-fetch the full collection and replace the mirror wholesale.
    ///
    /// The authoritative snapshot overwrites any optimistic patches; a
    /// failed fetch keeps the previous mirror untouched.
    async fn reconcile(&self) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Ready {
            return;
        }
        let Some(store) = inner.store.as_deref() else {
            return;
        };

        match store.list().await {
            Ok(mut issues) => {
                sort_newest_first(&mut issues);
                inner.mirror = issues;
                self.publish(&inner);
            }
            Err(e) => {
                tracing::warn!(error = %e, "reconciling fetch failed, keeping previous mirror");
            }
        }
    }

    async fn spawn_listener(service: &Arc<Self>, mut changes: broadcast::Receiver<ChangeEvent>) {
        let live = Arc::clone(&service.live);
        let task_service = Arc::clone(service);

        let handle = tokio::spawn(async move {
            let service = task_service;
            loop {
                match changes.recv().await {
                    Ok(event) => {
                        // Guard against a late notification on a torn-down
                        // session.
                        if !live.load(Ordering::SeqCst) {
                            break;
                        }
                        tracing::debug!(?event, "change notification received, refetching");
                        service.reconcile().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        if !live.load(Ordering::SeqCst) {
                            break;
                        }
                        tracing::warn!(skipped, "change stream lagged, refetching");
                        service.reconcile().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        service.inner.lock().await.listener = Some(handle);
    }
}
