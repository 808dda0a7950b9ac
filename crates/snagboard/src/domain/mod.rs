//! Domain types for the maintenance issue board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable, opaque identifier for an issue.
///
/// Assigned by the active backend at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub String);

impl IssueId {
    /// Create a new issue ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of a member, as an email address.
///
/// Serialized transparently as a plain string, both in upvote sets and in
/// the `submittedBy` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The persisted current-identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Email address of the member.
    pub email: String,

    /// Opaque account identifier from the auth provider.
    pub uid: String,
}

impl UserAccount {
    /// The member's identity for issue operations.
    pub fn identity(&self) -> UserId {
        UserId::new(self.email.clone())
    }
}

/// Status of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    /// Reported, not yet picked up.
    Pending,

    /// Someone is working on it.
    #[serde(rename = "In Progress")]
    InProgress,

    /// Resolved.
    Fixed,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStatus::Pending => "Pending",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Fixed => "Fixed",
        };
        write!(f, "{s}")
    }
}

/// A single reported maintenance issue.
///
/// Serialized camelCase with an RFC 3339 timestamp; this is both the
/// in-memory mirror shape and the local persistence blob shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Unique identifier, assigned by the backend at creation.
    pub id: IssueId,

    /// Issue title.
    pub title: String,

    /// Issue description.
    pub description: String,

    /// Identity of the creating member; immutable after creation.
    pub submitted_by: UserId,

    /// Creation timestamp; the default display ordering key (descending).
    pub date_submitted: DateTime<Utc>,

    /// Identities that upvoted this issue. Semantically a set: no
    /// duplicates, mutated only through the upvote operations.
    pub upvotes: Vec<UserId>,

    /// Current status.
    pub status: IssueStatus,
}

impl Issue {
    /// Whether the given identity has upvoted this issue.
    pub fn has_upvote(&self, user: &UserId) -> bool {
        self.upvotes.contains(user)
    }

    /// Number of distinct upvotes.
    pub fn upvote_count(&self) -> usize {
        self.upvotes.len()
    }
}

/// Data for creating a new issue.
///
/// Id, timestamp, status, and upvotes are backend-assigned.
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// Issue title.
    pub title: String,

    /// Issue description.
    pub description: String,
}

/// Partial update of an existing issue.
///
/// Fields present are overwritten; absent fields are left unchanged.
/// Upvotes are never modified through this path.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    /// New title (if updating).
    pub title: Option<String>,

    /// New description (if updating).
    pub description: Option<String>,

    /// New status (if updating).
    pub status: Option<IssueStatus>,
}

/// Remove duplicate identities from an upvote list, keeping first
/// occurrences in order.
pub fn dedup_upvotes(upvotes: &mut Vec<UserId>) {
    let mut seen = std::collections::HashSet::new();
    upvotes.retain(|u| seen.insert(u.clone()));
}

/// Sort issues newest-first by submission time, the authoritative ordering
/// re-established on every full mirror replacement.
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.date_submitted.cmp(&a.date_submitted));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_issue() -> Issue {
        Issue {
            id: IssueId::new("42"),
            title: "Leak".to_string(),
            description: "Under sink".to_string(),
            submitted_by: UserId::new("a@x.edu"),
            date_submitted: Utc.with_ymd_and_hms(2024, 5, 2, 12, 30, 0).unwrap(),
            upvotes: vec![UserId::new("b@x.edu")],
            status: IssueStatus::Pending,
        }
    }

    #[test]
    fn issue_serializes_camel_case_with_iso_timestamp() {
        let json = serde_json::to_value(sample_issue()).unwrap();

        assert_eq!(json["id"], "42");
        assert_eq!(json["submittedBy"], "a@x.edu");
        assert_eq!(json["dateSubmitted"], "2024-05-02T12:30:00Z");
        assert_eq!(json["upvotes"][0], "b@x.edu");
        assert_eq!(json["status"], "Pending");
    }

    #[test]
    fn issue_round_trips_through_json() {
        let issue = sample_issue();
        let json = serde_json::to_string(&issue).unwrap();
        let restored: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, issue);
    }

    #[test]
    fn status_wire_strings_match_display() {
        for (status, wire) in [
            (IssueStatus::Pending, "\"Pending\""),
            (IssueStatus::InProgress, "\"In Progress\""),
            (IssueStatus::Fixed, "\"Fixed\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(format!("\"{status}\""), wire);
        }
    }

    #[test]
    fn dedup_upvotes_keeps_first_occurrence_order() {
        let mut upvotes = vec![
            UserId::new("a@x.edu"),
            UserId::new("b@x.edu"),
            UserId::new("a@x.edu"),
            UserId::new("c@x.edu"),
            UserId::new("b@x.edu"),
        ];
        dedup_upvotes(&mut upvotes);
        assert_eq!(
            upvotes,
            vec![
                UserId::new("a@x.edu"),
                UserId::new("b@x.edu"),
                UserId::new("c@x.edu"),
            ]
        );
    }

    #[test]
    fn sort_newest_first_orders_descending() {
        let mut issues: Vec<Issue> = [1, 3, 2]
            .into_iter()
            .map(|day| {
                let mut issue = sample_issue();
                issue.id = IssueId::new(day.to_string());
                issue.date_submitted = Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap();
                issue
            })
            .collect();

        sort_newest_first(&mut issues);
        let ids: Vec<&str> = issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }
}
