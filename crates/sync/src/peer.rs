use async_trait::async_trait;
use hub_primitives::{Fid, HubError, IdRegistryEvent, Message};
use hub_trie::NodeMetadata;

/// RPC capability set the engine consumes from a remote hub.
///
/// Hex arguments follow the wire convention: the engine prepends `0x` to
/// outgoing hashes; ids returned by a peer may carry the prefix and are
/// normalized before use.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Identity of the remote hub, for logs and sync lifecycle events.
    fn peer_id(&self) -> String;

    /// Node metadata (count, hash, children) for an exact trie prefix.
    async fn get_sync_metadata_by_prefix(&self, prefix: &[u8]) -> Result<NodeMetadata, HubError>;

    /// Every sync id under the prefix, hex-encoded.
    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Result<Vec<String>, HubError>;

    /// Full messages for the given sync-id hashes.
    async fn get_messages_by_hashes(&self, hashes: &[String]) -> Result<Vec<Message>, HubError>;

    /// The custody event that registered `fid`.
    async fn get_custody_event_by_fid(&self, fid: &Fid) -> Result<IdRegistryEvent, HubError>;

    /// All signer messages `fid` has emitted.
    async fn get_all_signer_messages_by_fid(&self, fid: &Fid) -> Result<Vec<Message>, HubError>;
}
