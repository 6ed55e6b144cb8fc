//! Timestamp-prefixed Merkle trie over sync identifiers.
//!
//! Every locally known message is indexed under a [`SyncId`]: its timestamp
//! rendered as a zero-padded decimal string, followed by the message hash.
//! The trie keeps a running 160-bit commitment per subtree, so two hubs can
//! compare a handful of hashes to find the shortest prefix under which their
//! message sets disagree, then fetch only what is missing beneath it.
//!
//! The trie is single-owner and lock-free: the sync engine is the only
//! writer, and all mutation happens on one task runner. Reads are total:
//! an unknown prefix yields an absent value, never an error.

mod node;
mod sync_id;
mod trie;

pub use node::{NodeMetadata, TrieNode};
pub use sync_id::{SyncId, TIMESTAMP_LENGTH};
pub use trie::{MerkleTrie, TrieSnapshot};
