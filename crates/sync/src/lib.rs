//! Reconciliation engine for the hub.
//!
//! Owns the Merkle trie, keeps it consistent with the storage engine
//! through merge/delete events, and drives the divergence walk against a
//! peer when gossiped contact records show the two hubs disagree.
//!
//! Everything here runs on a single logical task: the engine suspends at
//! storage and RPC boundaries but never shares the trie across tasks, so
//! no locking is needed.

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod peer;

pub use clock::{Clock, SystemClock};
pub use config::{SyncConfig, HASHES_PER_FETCH, SYNC_THRESHOLD_IN_SECONDS};
pub use engine::SyncEngine;
pub use events::{SyncEvent, SyncStatus};
pub use peer::PeerClient;
