//! Opaque issue-id generation.
//!
//! Ids are millisecond-timestamp strings, which keeps them opaque,
//! string-comparable, and roughly creation-ordered. A registry of issued
//! ids guards against collisions: two creations landing in the same
//! millisecond get a numeric disambiguation suffix (`"1717430400123-1"`).
//! Ids loaded from an existing collection must be registered before the
//! generator hands out new ones.

use crate::domain::IssueId;
use chrono::Utc;
use std::collections::HashSet;

/// Issue-id generator with collision tracking.
#[derive(Debug, Default)]
pub struct IdGenerator {
    used: HashSet<String>,
}

impl IdGenerator {
    /// Create a generator with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing id so it is never handed out again.
    pub fn register(&mut self, id: impl Into<String>) {
        self.used.insert(id.into());
    }

    /// Produce a fresh unique id and record it in the registry.
    pub fn next_id(&mut self) -> IssueId {
        let base = Utc::now().timestamp_millis().to_string();
        if self.used.insert(base.clone()) {
            return IssueId::new(base);
        }

        let mut nonce = 1u64;
        loop {
            let candidate = format!("{base}-{nonce}");
            if self.used.insert(candidate.clone()) {
                return IssueId::new(candidate);
            }
            nonce += 1;
        }
    }
}
