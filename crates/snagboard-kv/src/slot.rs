//! The slot store trait and typed payload helpers.
//!
//! A slot store maps slot names to whole string payloads. Reads and writes
//! always cover the entire payload; there is no partial update. Consumers
//! that need serialized structures use [`read_slot`] and [`write_slot`],
//! which layer JSON (de)serialization on top of any `dyn SlotStore`.

use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Whole-payload persistence under named slots.
///
/// Implementations must be `Send + Sync` so a store can be shared behind an
/// `Arc` across async tasks. The trait is object-safe; typed access goes
/// through the free functions [`read_slot`] and [`write_slot`].
///
/// # Consistency
///
/// A slot store makes no atomicity promise across a read-modify-write cycle:
/// two writers racing on the same slot resolve last-write-wins. Individual
/// writes must however be atomic (a reader never observes a torn payload).
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Read the full payload of a slot.
    ///
    /// Returns `Ok(None)` if the slot has never been written or was removed.
    async fn read(&self, slot: &str) -> Result<Option<String>>;

    /// Replace the full payload of a slot, creating it if absent.
    async fn write(&self, slot: &str, payload: &str) -> Result<()>;

    /// Remove a slot entirely.
    ///
    /// Removing an absent slot is a no-op, not an error.
    async fn remove(&self, slot: &str) -> Result<()>;
}

/// Read and deserialize a typed value from a slot.
///
/// Returns `Ok(None)` if the slot is absent.
///
/// # Errors
///
/// Returns `Error::Json` if the payload exists but does not deserialize
/// into `T`, or `Error::Io` if the underlying read fails.
pub async fn read_slot<T: DeserializeOwned>(
    store: &dyn SlotStore,
    slot: &str,
) -> Result<Option<T>> {
    match store.read(slot).await? {
        Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

/// Serialize and write a typed value into a slot.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails, or `Error::Io` if the
/// underlying write fails.
pub async fn write_slot<T: Serialize>(store: &dyn SlotStore, slot: &str, value: &T) -> Result<()> {
    let payload = serde_json::to_string(value)?;
    store.write(slot, &payload).await
}
