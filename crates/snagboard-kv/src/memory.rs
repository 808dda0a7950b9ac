//! In-memory slot store for tests and ephemeral sessions.

use crate::Result;
use crate::slot::SlotStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// A slot store holding all payloads in a `HashMap`.
///
/// Nothing is persisted; contents vanish when the store is dropped. The map
/// sits behind a mutex so the store can be shared behind an `Arc` across
/// tasks.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    /// Create an empty in-memory slot store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn read(&self, slot: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().await;
        Ok(slots.get(slot).cloned())
    }

    async fn write(&self, slot: &str, payload: &str) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.insert(slot.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.remove(slot);
        Ok(())
    }
}
