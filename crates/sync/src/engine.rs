use std::sync::Arc;
use std::time::Instant;

use futures_util::TryStreamExt;
use hub_gossip::ContactInfoContent;
use hub_primitives::{HubError, Message};
use hub_store::{MergeSource, MessageStore, StoreEvent, StoreEventReceiver};
use hub_trie::{MerkleTrie, NodeMetadata, SyncId, TrieSnapshot, TIMESTAMP_LENGTH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::events::SyncEvent;
use crate::peer::PeerClient;

/// Drives anti-entropy reconciliation for one hub.
///
/// The engine owns the trie outright. Every mutation flows through the
/// storage event hooks or the one-shot initialization replay, and every
/// read the reconciliation pipeline needs goes through the owned trie, so
/// the whole structure stays single-task and lock-free.
pub struct SyncEngine<S> {
    trie: MerkleTrie,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    is_syncing: bool,
    initialized: bool,
    event_tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl<S: MessageStore> SyncEngine<S> {
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: SyncConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            trie: MerkleTrie::new(),
            store,
            clock,
            config,
            is_syncing: false,
            initialized: false,
            event_tx: None,
        }
    }

    pub fn trie(&self) -> &MerkleTrie {
        &self.trie
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn set_is_syncing(&mut self, value: bool) {
        self.is_syncing = value;
    }

    /// Registers an observer for sync lifecycle events. The latest
    /// subscriber wins.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_tx = Some(tx);
        rx
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Rebuilds the trie by replaying every persisted message. Runs once
    /// per process, before the engine starts consuming events.
    pub async fn initialize(&mut self) -> Result<(), HubError> {
        if self.initialized {
            return Err(HubError::BadInput(
                "sync engine already initialized".to_owned(),
            ));
        }

        let store = Arc::clone(&self.store);
        let mut messages = store.for_each_message();
        let mut count = 0_usize;
        while let Some(message) = messages.try_next().await? {
            match SyncId::from_message(&message) {
                Ok(id) => {
                    let _ = self.trie.insert(&id);
                }
                Err(err) => warn!(%err, "skipping message without sync id"),
            }
            count += 1;
            if count % self.config.init_log_every == 0 {
                info!(count, "sync trie initialization progress");
            }
        }

        self.initialized = true;
        info!(count, items = self.trie.items(), "sync trie initialized");
        Ok(())
    }

    /// Applies one storage mutation to the trie. Idempotent and
    /// order-insensitive: replaying an event leaves the trie unchanged.
    pub fn handle_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::MessageMerged { message, .. } => match SyncId::from_message(&message) {
                Ok(id) => {
                    let _ = self.trie.insert(&id);
                }
                Err(err) => warn!(%err, "merged message has no sync id"),
            },
            StoreEvent::MessageDeleted { message } => match SyncId::from_message(&message) {
                Ok(id) => {
                    let _ = self.trie.delete(&id);
                }
                Err(err) => warn!(%err, "deleted message has no sync id"),
            },
        }
    }

    /// Applies every event already sitting in the channel.
    pub fn drain_store_events(&mut self, events: &mut StoreEventReceiver) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_store_event(event);
            applied += 1;
        }
        applied
    }

    /// Current time floored to the sync threshold: the high-water mark
    /// below which data counts as settled.
    pub fn snapshot_timestamp(&self) -> u64 {
        let now = self.clock.now_secs();
        now - (now % self.config.sync_threshold_secs)
    }

    /// Snapshot prefix: the boundary timestamp with its final digit
    /// dropped, so the prefix names the whole 10-second bucket.
    pub fn snapshot_prefix(&self) -> Vec<u8> {
        let bucket = self.snapshot_timestamp() / 10;
        format!("{bucket:0width$}", width = TIMESTAMP_LENGTH - 1).into_bytes()
    }

    pub fn snapshot(&self) -> TrieSnapshot {
        self.trie.get_snapshot(&self.snapshot_prefix())
    }

    /// Whether a peer's advertised excluded hashes warrant a sync round.
    /// Always false while a round is already running.
    pub fn should_sync(&self, their_excluded_hashes: &[String]) -> bool {
        if self.is_syncing {
            return false;
        }
        self.snapshot().excluded_hashes != their_excluded_hashes
    }

    /// Convenience entry point for gossiped contact records: checks
    /// [`Self::should_sync`] and runs a round against the advertising
    /// peer. Returns whether a round ran.
    pub async fn handle_contact_info(
        &mut self,
        contact: &ContactInfoContent,
        peer: &impl PeerClient,
    ) -> bool {
        if !self.should_sync(&contact.excluded_hashes) {
            debug!(peer_id = %contact.peer_id, "snapshots agree, skipping sync");
            return false;
        }
        info!(
            peer_id = %contact.peer_id,
            count = contact.count,
            "contact record diverges, starting sync",
        );
        self.perform_sync(&contact.excluded_hashes, peer).await;
        true
    }

    /// One full reconciliation round. Never raises: every failure is
    /// logged and dropped, and the timer-driven gossip loop retries on the
    /// next contact record. The `is_syncing` guard is released on every
    /// exit path.
    pub async fn perform_sync(&mut self, their_excluded_hashes: &[String], peer: &impl PeerClient) {
        if self.is_syncing {
            debug!("sync already in progress, skipping");
            return;
        }
        self.is_syncing = true;
        let peer_id = peer.peer_id();
        let started = Instant::now();
        self.emit(SyncEvent::started(peer_id.clone()));

        let snapshot = self.snapshot();
        let divergence = self
            .trie
            .get_divergence_prefix(&snapshot.prefix, their_excluded_hashes);
        debug!(
            prefix = %String::from_utf8_lossy(&divergence),
            "divergence prefix computed",
        );

        let missing = self.fetch_missing_hashes_by_prefix(&divergence, peer).await;
        if missing.is_empty() {
            info!(%peer_id, "sync round found nothing to fetch");
            self.emit(SyncEvent::completed(
                peer_id,
                Some(0),
                started.elapsed().as_millis() as u64,
            ));
        } else if self.fetch_and_merge_messages(&missing, peer).await {
            info!(%peer_id, count = missing.len(), "sync round complete");
            self.emit(SyncEvent::completed(
                peer_id,
                Some(missing.len()),
                started.elapsed().as_millis() as u64,
            ));
        } else {
            self.emit(SyncEvent::failed(
                peer_id,
                "message fetch failed".to_owned(),
                started.elapsed().as_millis() as u64,
            ));
        }

        self.is_syncing = false;
    }

    /// Compares local and remote metadata at `prefix` and collects the
    /// sync ids we are missing beneath it. A metadata RPC failure yields
    /// an empty result; the round simply makes no progress there.
    pub async fn fetch_missing_hashes_by_prefix(
        &self,
        prefix: &[u8],
        peer: &impl PeerClient,
    ) -> Vec<String> {
        let our_node = self.trie.get_trie_node_metadata(prefix);
        let their_node = match peer.get_sync_metadata_by_prefix(prefix).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    %err,
                    prefix = %String::from_utf8_lossy(prefix),
                    "failed to fetch sync metadata",
                );
                return Vec::new();
            }
        };
        self.fetch_missing_hashes_by_node(their_node, our_node, peer)
            .await
    }

    /// The central recursion of the divergence walk. Small subtrees are
    /// fetched whole (local duplicates are cheap because merges are
    /// idempotent) and larger ones are walked child by child, skipping
    /// any child whose hash we already match. Depth is bounded by the sync
    /// id length, so the boxed recursion stays shallow.
    fn fetch_missing_hashes_by_node<'a, P: PeerClient>(
        &'a self,
        their_node: NodeMetadata,
        our_node: Option<NodeMetadata>,
        peer: &'a P,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Vec<String>> + 'a>> {
        Box::pin(async move {
            if their_node.num_messages <= self.config.hashes_per_fetch {
                return match peer.get_sync_ids_by_prefix(&their_node.prefix).await {
                    Ok(ids) => ids
                        .into_iter()
                        .map(|id| id.trim_start_matches("0x").to_owned())
                        .collect(),
                    Err(err) => {
                        warn!(
                            %err,
                            prefix = %String::from_utf8_lossy(&their_node.prefix),
                            "failed to fetch sync ids",
                        );
                        Vec::new()
                    }
                };
            }

            let mut missing = Vec::new();
            for (byte, their_child) in &their_node.children {
                let ours_matches = our_node
                    .as_ref()
                    .and_then(|node| node.children.get(byte))
                    .is_some_and(|our_child| our_child.hash == their_child.hash);
                if ours_matches {
                    continue;
                }
                let mut fetched = self
                    .fetch_missing_hashes_by_prefix(&their_child.prefix, peer)
                    .await;
                missing.append(&mut fetched);
            }
            missing
        })
    }

    /// Fetches the messages behind `ids` and merges them sequentially;
    /// later messages may depend on earlier ones. A merge rejected for an
    /// unknown user triggers dependency recovery. Returns false when there
    /// was nothing to do or the fetch itself failed.
    pub async fn fetch_and_merge_messages(&self, ids: &[String], peer: &impl PeerClient) -> bool {
        if ids.is_empty() {
            return false;
        }

        let hashes: Vec<String> = ids
            .iter()
            .map(|id| format!("0x{}", id.trim_start_matches("0x")))
            .collect();
        let messages = match peer.get_messages_by_hashes(&hashes).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(%err, count = hashes.len(), "failed to fetch messages");
                return false;
            }
        };

        let mut merged = 0_usize;
        for message in messages {
            match self
                .store
                .merge_message(message.clone(), MergeSource::SyncEngine)
                .await
            {
                Ok(()) => merged += 1,
                Err(err) if err.is_unknown_fid() => {
                    match self.sync_user_and_retry_message(&message, peer).await {
                        Ok(()) => merged += 1,
                        Err(retry_err) => {
                            warn!(%retry_err, "dependency recovery failed");
                        }
                    }
                }
                Err(err) => debug!(%err, "merge failed"),
            }
        }
        info!(merged, fetched = hashes.len(), "merged fetched messages");
        true
    }

    /// Dependency recovery for a message whose user the local store does
    /// not know: pull the custody event, then the user's signer messages,
    /// then retry the original merge.
    pub async fn sync_user_and_retry_message(
        &self,
        message: &Message,
        peer: &impl PeerClient,
    ) -> Result<(), HubError> {
        let fid = message
            .fid()
            .cloned()
            .ok_or_else(|| HubError::BadInput("message has no fid".to_owned()))?;

        let custody_event = peer.get_custody_event_by_fid(&fid).await.map_err(|err| {
            HubError::NetworkFailure(format!("failed to fetch custody event: {err}"))
        })?;
        self.store
            .merge_id_registry_event(custody_event, MergeSource::SyncEngine)
            .await
            .map_err(|err| {
                HubError::StorageFailure(format!("failed to merge custody event: {err}"))
            })?;

        let signers = peer
            .get_all_signer_messages_by_fid(&fid)
            .await
            .map_err(|err| {
                HubError::NetworkFailure(format!("failed to fetch signer messages: {err}"))
            })?;

        // The store may merge these concurrently; results are positional.
        let results = self
            .store
            .merge_messages(signers, MergeSource::SyncEngine)
            .await;
        if !results.is_empty() && results.iter().all(Result::is_err) {
            return Err(HubError::StorageFailure(
                "all signer merges failed".to_owned(),
            ));
        }

        self.store
            .merge_message(message.clone(), MergeSource::SyncEngine)
            .await
            .map_err(|err| HubError::StorageFailure(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use hub_primitives::{Fid, IdRegistryEvent};
    use hub_store::MemoryStore;

    use super::*;

    /// Peer that counts calls and fails them all.
    #[derive(Default)]
    struct UnreachablePeer {
        calls: AtomicUsize,
    }

    impl UnreachablePeer {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn unavailable<T>(&self) -> Result<T, HubError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            Err(HubError::NetworkFailure("unreachable".to_owned()))
        }
    }

    #[async_trait]
    impl PeerClient for UnreachablePeer {
        fn peer_id(&self) -> String {
            "unreachable-peer".to_owned()
        }

        async fn get_sync_metadata_by_prefix(
            &self,
            _prefix: &[u8],
        ) -> Result<NodeMetadata, HubError> {
            self.unavailable()
        }

        async fn get_sync_ids_by_prefix(&self, _prefix: &[u8]) -> Result<Vec<String>, HubError> {
            self.unavailable()
        }

        async fn get_messages_by_hashes(
            &self,
            _hashes: &[String],
        ) -> Result<Vec<Message>, HubError> {
            self.unavailable()
        }

        async fn get_custody_event_by_fid(&self, _fid: &Fid) -> Result<IdRegistryEvent, HubError> {
            self.unavailable()
        }

        async fn get_all_signer_messages_by_fid(
            &self,
            _fid: &Fid,
        ) -> Result<Vec<Message>, HubError> {
            self.unavailable()
        }
    }

    #[derive(Clone, Copy, Debug)]
    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_secs(&self) -> u64 {
            self.0
        }
    }

    fn engine() -> SyncEngine<MemoryStore> {
        SyncEngine::with_clock(
            Arc::new(MemoryStore::new()),
            SyncConfig::default(),
            Arc::new(FixedClock(30_000)),
        )
    }

    #[tokio::test]
    async fn should_sync_is_false_while_a_round_runs() {
        let mut engine = engine();

        let foreign = vec!["ffff".to_owned(); 9];
        assert!(engine.should_sync(&foreign));

        engine.set_is_syncing(true);
        assert!(!engine.should_sync(&foreign));

        engine.set_is_syncing(false);
        assert!(engine.should_sync(&foreign));
    }

    #[tokio::test]
    async fn overlapping_perform_sync_is_refused() {
        let mut engine = engine();
        let peer = UnreachablePeer::default();

        engine.set_is_syncing(true);
        engine.perform_sync(&vec!["ffff".to_owned(); 9], &peer).await;

        // The guarded round never reached the peer.
        assert_eq!(peer.calls(), 0);
        assert!(engine.is_syncing());
    }

    #[tokio::test]
    async fn unreachable_peer_fails_the_round_quietly() {
        let mut engine = engine();
        let peer = UnreachablePeer::default();

        engine.perform_sync(&vec!["ffff".to_owned(); 9], &peer).await;

        assert!(!engine.is_syncing());
        assert_eq!(peer.calls(), 1);
        assert_eq!(engine.trie().items(), 0);
    }
}
