//! Key/value-backed local store.
//!
//! Implements [`IssueStore`] over an injected [`SlotStore`]. The entire
//! issue collection serializes through a single logical slot as one JSON
//! array; every operation is a read-modify-write of that blob, so timestamps
//! are restored from their serialized form on every read. The
//! read-modify-write cycle is not atomic across concurrent processes:
//! last write wins, a documented limitation of this variant.
//!
//! The same substrate also holds the current-identity record, which keeps a
//! session logged in across restarts. That is not an issue-collection
//! concern, so it is exposed as [`LocalStore`] methods outside the trait.
//!
//! On first use an empty collection is seeded with three illustrative
//! sample issues used for demo and onboarding.

use crate::domain::{
    Issue, IssueId, IssueStatus, IssueUpdate, NewIssue, UserAccount, UserId, sort_newest_first,
};
use crate::error::Result;
use crate::id_generation::IdGenerator;
use crate::store::IssueStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use snagboard_kv::{SlotStore, read_slot, write_slot};
use std::sync::Arc;

/// Slot holding the serialized issue collection.
pub const ISSUES_SLOT: &str = "snagboard_issues";

/// Slot holding the serialized current-identity record, absent when
/// logged out.
pub const CURRENT_USER_SLOT: &str = "snagboard_current_user";

/// Local persistence over a key/value slot store.
pub struct LocalStore {
    slots: Arc<dyn SlotStore>,
    ids: IdGenerator,
}

impl LocalStore {
    /// Open the local store, seeding the sample collection if the issue
    /// slot is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot store cannot be read or the seed write
    /// fails.
    pub async fn open(slots: Arc<dyn SlotStore>) -> Result<Self> {
        let mut store = Self {
            slots,
            ids: IdGenerator::new(),
        };

        let issues = store.load_issues().await?;
        if issues.is_empty() {
            let samples = sample_issues();
            tracing::debug!(count = samples.len(), "seeding sample issues");
            store.save_issues(&samples).await?;
            for issue in &samples {
                store.ids.register(issue.id.as_str());
            }
        } else {
            for issue in &issues {
                store.ids.register(issue.id.as_str());
            }
        }

        Ok(store)
    }

    async fn load_issues(&self) -> Result<Vec<Issue>> {
        Ok(read_slot::<Vec<Issue>>(self.slots.as_ref(), ISSUES_SLOT)
            .await?
            .unwrap_or_default())
    }

    async fn save_issues(&self, issues: &[Issue]) -> Result<()> {
        write_slot(self.slots.as_ref(), ISSUES_SLOT, &issues).await?;
        Ok(())
    }

    /// Persist the current identity, or clear it when `None` (logout).
    pub async fn set_current_user(&self, user: Option<&UserAccount>) -> Result<()> {
        match user {
            Some(account) => write_slot(self.slots.as_ref(), CURRENT_USER_SLOT, account).await?,
            None => self.slots.remove(CURRENT_USER_SLOT).await?,
        }
        Ok(())
    }

    /// The persisted current identity, if any.
    pub async fn current_user(&self) -> Result<Option<UserAccount>> {
        Ok(read_slot(self.slots.as_ref(), CURRENT_USER_SLOT).await?)
    }

    /// Remove both the issue collection and the identity record.
    pub async fn clear_all_data(&self) -> Result<()> {
        self.slots.remove(ISSUES_SLOT).await?;
        self.slots.remove(CURRENT_USER_SLOT).await?;
        Ok(())
    }
}

#[async_trait]
impl IssueStore for LocalStore {
    async fn list(&self) -> Result<Vec<Issue>> {
        let mut issues = self.load_issues().await?;
        sort_newest_first(&mut issues);
        Ok(issues)
    }

    async fn create(&mut self, data: NewIssue, author: &UserId) -> Result<Issue> {
        let mut issues = self.load_issues().await?;

        let issue = Issue {
            id: self.ids.next_id(),
            title: data.title,
            description: data.description,
            submitted_by: author.clone(),
            date_submitted: Utc::now(),
            upvotes: Vec::new(),
            status: IssueStatus::Pending,
        };

        issues.push(issue.clone());
        self.save_issues(&issues).await?;
        Ok(issue)
    }

    async fn update(&mut self, id: &IssueId, patch: IssueUpdate) -> Result<Issue> {
        let mut issues = self.load_issues().await?;

        let issue = issues
            .iter_mut()
            .find(|issue| &issue.id == id)
            .ok_or_else(|| crate::error::Error::IssueNotFound(id.clone()))?;

        if let Some(title) = patch.title {
            issue.title = title;
        }
        if let Some(description) = patch.description {
            issue.description = description;
        }
        if let Some(status) = patch.status {
            issue.status = status;
        }

        let updated = issue.clone();
        self.save_issues(&issues).await?;
        Ok(updated)
    }

    async fn delete(&mut self, id: &IssueId) -> Result<bool> {
        let mut issues = self.load_issues().await?;
        let before = issues.len();
        issues.retain(|issue| &issue.id != id);

        if issues.len() == before {
            return Ok(false);
        }

        self.save_issues(&issues).await?;
        Ok(true)
    }

    async fn add_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool> {
        let mut issues = self.load_issues().await?;

        let issue = issues
            .iter_mut()
            .find(|issue| &issue.id == id)
            .ok_or_else(|| crate::error::Error::IssueNotFound(id.clone()))?;

        if issue.has_upvote(user) {
            return Ok(false);
        }

        issue.upvotes.push(user.clone());
        self.save_issues(&issues).await?;
        Ok(true)
    }

    async fn remove_upvote(&mut self, id: &IssueId, user: &UserId) -> Result<bool> {
        let mut issues = self.load_issues().await?;

        let issue = issues
            .iter_mut()
            .find(|issue| &issue.id == id)
            .ok_or_else(|| crate::error::Error::IssueNotFound(id.clone()))?;

        if !issue.has_upvote(user) {
            return Ok(false);
        }

        issue.upvotes.retain(|u| u != user);
        self.save_issues(&issues).await?;
        Ok(true)
    }
}

/// The three illustrative sample issues seeded into a fresh collection.
fn sample_issues() -> Vec<Issue> {
    let now = Utc::now();
    vec![
        Issue {
            id: IssueId::new("1"),
            title: "Broken washing machine in laundry room".to_string(),
            description: "The washing machine on the second floor is making loud noises \
                          and not draining properly. Water is pooling at the bottom."
                .to_string(),
            submitted_by: UserId::new("member1@fraternity.edu"),
            date_submitted: now - Duration::days(1),
            upvotes: vec![
                UserId::new("member2@fraternity.edu"),
                UserId::new("president@fraternity.edu"),
            ],
            status: IssueStatus::InProgress,
        },
        Issue {
            id: IssueId::new("2"),
            title: "Kitchen sink faucet leaking".to_string(),
            description: "The main kitchen sink has a persistent drip that started \
                          yesterday. It's wasting water and making noise."
                .to_string(),
            submitted_by: UserId::new("president@fraternity.edu"),
            date_submitted: now - Duration::hours(12),
            upvotes: vec![UserId::new("member1@fraternity.edu")],
            status: IssueStatus::Pending,
        },
        Issue {
            id: IssueId::new("3"),
            title: "WiFi dead zone in study room".to_string(),
            description: "The WiFi signal is very weak in the main study room. Members \
                          can't connect to video calls for classes."
                .to_string(),
            submitted_by: UserId::new("member2@fraternity.edu"),
            date_submitted: now - Duration::hours(6),
            upvotes: vec![
                UserId::new("member1@fraternity.edu"),
                UserId::new("president@fraternity.edu"),
                UserId::new("member3@fraternity.edu"),
            ],
            status: IssueStatus::Pending,
        },
    ]
}
