//! Snagboard - issue synchronization and persistence for a housing
//! maintenance issue board.
//!
//! Members of a house report maintenance issues, upvote them, and track
//! their status. This crate owns the state-consistency core of that board:
//! a pluggable persistence backend ([`store::IssueStore`]) with a
//! key/value-backed local variant and a remote row-store variant, and a
//! synchronization service ([`sync::SyncService`]) that keeps an in-memory
//! mirror of the issue collection consistent with whichever backend is
//! active, applying optimistic updates and reconciling against change
//! notifications.

#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod id_generation;
pub mod store;
pub mod sync;
