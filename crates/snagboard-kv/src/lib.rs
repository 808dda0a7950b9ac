//! A small named-slot key/value persistence substrate.
//!
//! This library stores whole serialized values under named *slots*: each slot
//! holds one opaque string payload that is read and written in its entirety.
//! It deliberately offers no partial updates, queries, or transactions; the
//! consumer performs read-modify-write cycles over whole slots.
//!
//! Two implementations are provided:
//!
//! - [`FileSlotStore`] persists each slot as a JSON file in a directory,
//!   using atomic temp-file-then-rename writes.
//! - [`MemorySlotStore`] keeps slots in a `HashMap`, for tests and ephemeral
//!   sessions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;
pub mod slot;

pub use error::{Error, Result};
pub use file::FileSlotStore;
pub use memory::MemorySlotStore;
pub use slot::{SlotStore, read_slot, write_slot};
