//! Storage surface consumed by the sync core.
//!
//! The real storage engine lives outside this workspace; the sync engine
//! only needs the narrow capability set modelled here: replaying every
//! persisted message, merging fetched messages and custody events, and a
//! stream of mutation events to keep the trie current.
//!
//! Events are delivered over an unbounded channel in the order the
//! underlying transactions committed. The sync engine consumes them on its
//! single task runner; no locks are shared with the trie.

use async_trait::async_trait;
use core::fmt;
use futures_util::stream::BoxStream;
use hub_primitives::{Fid, HubError, IdRegistryEvent, Message, MessageType};
use tokio::sync::mpsc;

#[cfg(any(test, feature = "testing"))]
mod memory;

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;

pub type StoreEventReceiver = mpsc::UnboundedReceiver<StoreEvent>;

/// Attribution tag recorded with every merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeSource {
    Gossip,
    Rpc,
    SyncEngine,
}

impl fmt::Display for MergeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gossip => "gossip",
            Self::Rpc => "rpc",
            Self::SyncEngine => "sync-engine",
        };
        write!(f, "{name}")
    }
}

/// Mutation record emitted by the storage engine after a transaction
/// commits. Delete events are advisory: the transaction may still have
/// failed, and the trie re-converges on the next sync round.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    MessageMerged {
        fid: Fid,
        message_type: MessageType,
        message: Message,
    },
    MessageDeleted {
        message: Message,
    },
}

/// Capability set the sync engine borrows from the storage engine.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Streams every persisted message in arbitrary order. Used once, at
    /// engine initialization, to rebuild the trie.
    fn for_each_message(&self) -> BoxStream<'_, Result<Message, HubError>>;

    /// Validates and persists one message. An unknown user is rejected
    /// with [`HubError::UnknownFid`] (status 412); a duplicate merge is an
    /// idempotent no-op that emits no event.
    async fn merge_message(&self, message: Message, source: MergeSource) -> Result<(), HubError>;

    /// Batch variant; results are positional. Implementations may merge
    /// concurrently.
    async fn merge_messages(
        &self,
        messages: Vec<Message>,
        source: MergeSource,
    ) -> Vec<Result<(), HubError>>;

    /// Merges an on-chain custody event, making the fid known.
    async fn merge_id_registry_event(
        &self,
        event: IdRegistryEvent,
        source: MergeSource,
    ) -> Result<(), HubError>;

    /// Registers a new event subscriber. Events are delivered in commit
    /// order, starting from the moment of subscription.
    fn subscribe(&self) -> StoreEventReceiver;
}
