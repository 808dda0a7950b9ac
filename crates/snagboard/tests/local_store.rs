//! Integration tests for the key/value-backed local store.
//!
//! Covers the shared store contract (creation defaults, partial updates,
//! delete semantics, upvote set semantics, ordering) plus the local-only
//! concerns: first-use seeding, identity persistence, and the file-backed
//! slot substrate.

use chrono::{TimeZone, Utc};
use rstest::rstest;
use snagboard::domain::{Issue, IssueId, IssueStatus, IssueUpdate, NewIssue, UserId};
use snagboard::error::Error;
use snagboard::store::local::{ISSUES_SLOT, LocalStore};
use snagboard::store::IssueStore;
use snagboard_kv::{FileSlotStore, MemorySlotStore, SlotStore};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_store() -> LocalStore {
    let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
    LocalStore::open(slots).await.unwrap()
}

fn leak_report() -> NewIssue {
    NewIssue {
        title: "Leak".to_string(),
        description: "Under sink".to_string(),
    }
}

// ========== Creation ==========

#[tokio::test]
async fn creation_defaults() {
    let mut store = open_store().await;
    let author = UserId::new("a@x.edu");

    let issue = store.create(leak_report(), &author).await.unwrap();

    assert_eq!(issue.title, "Leak");
    assert_eq!(issue.description, "Under sink");
    assert_eq!(issue.submitted_by, author);
    assert_eq!(issue.status, IssueStatus::Pending);
    assert!(issue.upvotes.is_empty());
    assert!(!issue.id.as_str().is_empty());

    // The id is fresh: no other issue carries it.
    let issues = store.list().await.unwrap();
    assert_eq!(issues.iter().filter(|i| i.id == issue.id).count(), 1);
}

#[tokio::test]
async fn created_ids_are_unique() {
    let mut store = open_store().await;
    let author = UserId::new("a@x.edu");

    let first = store.create(leak_report(), &author).await.unwrap();
    let second = store.create(leak_report(), &author).await.unwrap();
    assert_ne!(first.id, second.id);
}

// ========== Seeding ==========

#[tokio::test]
async fn fresh_store_seeds_three_sample_issues() {
    let store = open_store().await;
    let issues = store.list().await.unwrap();

    assert_eq!(issues.len(), 3);

    let washing_machine = issues
        .iter()
        .find(|i| i.title == "Broken washing machine in laundry room")
        .expect("seeded washing machine issue missing");
    assert_eq!(washing_machine.status, IssueStatus::InProgress);
    assert_eq!(washing_machine.upvote_count(), 2);
}

// ========== Updates ==========

#[tokio::test]
async fn partial_update_preserves_untouched_fields() {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();

    let updated = store
        .update(
            &issue.id,
            IssueUpdate {
                status: Some(IssueStatus::Fixed),
                ..IssueUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Leak");
    assert_eq!(updated.description, "Under sink");
    assert_eq!(updated.status, IssueStatus::Fixed);
}

#[rstest]
#[case(IssueStatus::Pending)]
#[case(IssueStatus::InProgress)]
#[case(IssueStatus::Fixed)]
#[tokio::test]
async fn status_transitions_to_any_value(#[case] status: IssueStatus) {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();

    let updated = store
        .update(
            &issue.id,
            IssueUpdate {
                status: Some(status),
                ..IssueUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, status);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let mut store = open_store().await;

    let result = store
        .update(
            &IssueId::new("no-such-issue"),
            IssueUpdate {
                title: Some("New title".to_string()),
                ..IssueUpdate::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::IssueNotFound(_))));
}

// ========== Delete ==========

#[tokio::test]
async fn delete_is_final_and_reports_existence() {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();

    assert!(store.delete(&issue.id).await.unwrap());
    assert!(
        !store
            .list()
            .await
            .unwrap()
            .iter()
            .any(|i| i.id == issue.id)
    );

    // The second delete finds nothing; that is not an error.
    assert!(!store.delete(&issue.id).await.unwrap());
}

// ========== Upvotes ==========

#[tokio::test]
async fn upvote_is_idempotent() {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();
    let voter = UserId::new("b@x.edu");

    assert!(store.add_upvote(&issue.id, &voter).await.unwrap());
    assert!(!store.add_upvote(&issue.id, &voter).await.unwrap());

    let issues = store.list().await.unwrap();
    let upvotes = &issues.iter().find(|i| i.id == issue.id).unwrap().upvotes;
    assert_eq!(upvotes.iter().filter(|u| **u == voter).count(), 1);
}

#[tokio::test]
async fn upvote_then_unvote_restores_prior_set() {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();

    store
        .add_upvote(&issue.id, &UserId::new("b@x.edu"))
        .await
        .unwrap();
    let before = store.list().await.unwrap();

    let voter = UserId::new("c@x.edu");
    assert!(store.add_upvote(&issue.id, &voter).await.unwrap());
    assert!(store.remove_upvote(&issue.id, &voter).await.unwrap());

    assert_eq!(store.list().await.unwrap(), before);
}

#[tokio::test]
async fn remove_absent_upvote_is_benign_no_op() {
    let mut store = open_store().await;
    let issue = store
        .create(leak_report(), &UserId::new("a@x.edu"))
        .await
        .unwrap();

    let before = store.list().await.unwrap();
    assert!(
        !store
            .remove_upvote(&issue.id, &UserId::new("b@x.edu"))
            .await
            .unwrap()
    );
    assert_eq!(store.list().await.unwrap(), before);
}

#[tokio::test]
async fn upvote_unknown_id_is_not_found() {
    let mut store = open_store().await;

    let result = store
        .add_upvote(&IssueId::new("no-such-issue"), &UserId::new("a@x.edu"))
        .await;
    assert!(matches!(result, Err(Error::IssueNotFound(_))));
}

// ========== Ordering ==========

#[tokio::test]
async fn list_orders_descending_by_submission_time() {
    let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());

    // Pre-populate the slot with distinct dates in shuffled order; a
    // non-empty collection is never reseeded.
    let issues: Vec<Issue> = [("a", 3), ("b", 1), ("c", 4), ("d", 2)]
        .into_iter()
        .map(|(id, day)| Issue {
            id: IssueId::new(id),
            title: format!("Issue {id}"),
            description: "…".to_string(),
            submitted_by: UserId::new("a@x.edu"),
            date_submitted: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
            upvotes: Vec::new(),
            status: IssueStatus::Pending,
        })
        .collect();
    slots
        .write(ISSUES_SLOT, &serde_json::to_string(&issues).unwrap())
        .await
        .unwrap();

    let store = LocalStore::open(slots).await.unwrap();
    let listed = store.list().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "d", "b"]);
}

// ========== File-backed substrate ==========

#[tokio::test]
async fn collection_survives_reopen_over_file_slots() {
    let temp_dir = TempDir::new().unwrap();

    let created = {
        let slots: Arc<dyn SlotStore> =
            Arc::new(FileSlotStore::open(temp_dir.path()).await.unwrap());
        let mut store = LocalStore::open(slots).await.unwrap();
        store
            .create(leak_report(), &UserId::new("a@x.edu"))
            .await
            .unwrap()
    };

    let slots: Arc<dyn SlotStore> = Arc::new(FileSlotStore::open(temp_dir.path()).await.unwrap());
    let store = LocalStore::open(slots).await.unwrap();

    let issues = store.list().await.unwrap();
    assert_eq!(issues.len(), 4); // 3 seeds + 1 created
    let restored = issues.iter().find(|i| i.id == created.id).unwrap();
    assert_eq!(restored, &created);
}
