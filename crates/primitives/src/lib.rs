//! Shared value types for the hub.
//!
//! Everything in here is a plain data type consumed by the trie, the sync
//! engine, the storage surface and the gossip layer. No I/O, no async.

pub mod error;
pub mod events;
pub mod message;

pub use error::{HubError, HubResult};
pub use events::{IdRegistryEvent, IdRegistryEventType};
pub use message::{Fid, Message, MessageBody, MessageData, MessageType};

/// Seconds between the UNIX epoch and the Farcaster epoch
/// (2021-01-01T00:00:00Z). Message timestamps count from the latter.
pub const FARCASTER_EPOCH_SECS: u64 = 1_609_459_200;
