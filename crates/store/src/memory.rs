//! In-memory reference store for tests and simulations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use hub_primitives::{Fid, HubError, IdRegistryEvent, Message, MessageType};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{MergeSource, MessageStore, StoreEvent, StoreEventReceiver};

#[derive(Default)]
struct Inner {
    custody: HashMap<Fid, IdRegistryEvent>,
    messages: BTreeMap<Vec<u8>, Message>,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

/// Hash-keyed message store with the same merge semantics the sync engine
/// expects from the real storage engine: messages of an unknown fid are
/// rejected with status 412 until a custody event lands, duplicates are
/// idempotent no-ops, and every state change emits an event.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn contains_hash(&self, hash: &[u8]) -> bool {
        self.lock().messages.contains_key(hash)
    }

    pub fn message_by_hash(&self, hash: &[u8]) -> Option<Message> {
        self.lock().messages.get(hash).cloned()
    }

    pub fn custody_event(&self, fid: &Fid) -> Option<IdRegistryEvent> {
        self.lock().custody.get(fid).cloned()
    }

    pub fn signer_messages(&self, fid: &Fid) -> Vec<Message> {
        self.lock()
            .messages
            .values()
            .filter(|m| m.fid() == Some(fid))
            .filter(|m| m.message_type().is_some_and(MessageType::is_signer))
            .cloned()
            .collect()
    }

    /// Removes a message and emits the advisory delete event.
    pub fn delete_message(&self, hash: &[u8]) -> bool {
        let (removed, events) = {
            let mut inner = self.lock();
            match inner.messages.remove(hash) {
                Some(message) => (true, vec![StoreEvent::MessageDeleted { message }]),
                None => (false, vec![]),
            }
        };
        self.emit(events);
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, events: Vec<StoreEvent>) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    fn validate(message: &Message) -> Result<(Fid, MessageType), HubError> {
        let data = message
            .data
            .as_ref()
            .ok_or_else(|| HubError::BadInput("message has no data".to_owned()))?;
        if message.hash.is_empty() {
            return Err(HubError::BadInput("message has no hash".to_owned()));
        }
        Ok((data.fid.clone(), data.message_type))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    fn for_each_message(&self) -> BoxStream<'_, Result<Message, HubError>> {
        let messages: Vec<Message> = self.lock().messages.values().cloned().collect();
        stream::iter(messages.into_iter().map(Ok)).boxed()
    }

    async fn merge_message(&self, message: Message, source: MergeSource) -> Result<(), HubError> {
        let (fid, message_type) = Self::validate(&message)?;

        let events = {
            let mut inner = self.lock();
            if !inner.custody.contains_key(&fid) {
                return Err(HubError::UnknownFid(fid));
            }
            if inner.messages.contains_key(&message.hash) {
                debug!(%fid, %source, "duplicate merge ignored");
                return Ok(());
            }
            let _ = inner.messages.insert(message.hash.clone(), message.clone());
            vec![StoreEvent::MessageMerged {
                fid,
                message_type,
                message,
            }]
        };
        self.emit(events);
        Ok(())
    }

    async fn merge_messages(
        &self,
        messages: Vec<Message>,
        source: MergeSource,
    ) -> Vec<Result<(), HubError>> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            results.push(self.merge_message(message, source).await);
        }
        results
    }

    async fn merge_id_registry_event(
        &self,
        event: IdRegistryEvent,
        source: MergeSource,
    ) -> Result<(), HubError> {
        debug!(fid = %event.fid, %source, "custody event merged");
        let _ = self.lock().custody.insert(event.fid.clone(), event);
        Ok(())
    }

    fn subscribe(&self) -> StoreEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use hub_primitives::{IdRegistryEventType, MessageBody, MessageData};

    use super::*;

    fn custody(fid: u64) -> IdRegistryEvent {
        IdRegistryEvent {
            fid: Fid::from(fid),
            custody_address: vec![0xaa],
            event_type: IdRegistryEventType::Register,
            block_number: 1,
        }
    }

    fn cast(fid: u64, timestamp: u64, hash: &[u8]) -> Message {
        Message {
            data: Some(MessageData {
                fid: Fid::from(fid),
                timestamp,
                message_type: MessageType::CastAdd,
                body: MessageBody::Cast {
                    text: "gm".to_owned(),
                },
            }),
            hash: hash.to_vec(),
            signature: vec![],
            signer: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_fid_is_rejected_with_412() {
        let store = MemoryStore::new();
        let err = store
            .merge_message(cast(1, 1000, b"ab"), MergeSource::SyncEngine)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 412);
    }

    #[tokio::test]
    async fn merge_emits_an_event_once() -> eyre::Result<()> {
        let store = MemoryStore::new();
        let mut events = store.subscribe();

        store
            .merge_id_registry_event(custody(1), MergeSource::SyncEngine)
            .await?;
        store
            .merge_message(cast(1, 1000, b"ab"), MergeSource::SyncEngine)
            .await?;
        // Duplicate: no error, no second event.
        store
            .merge_message(cast(1, 1000, b"ab"), MergeSource::SyncEngine)
            .await?;

        assert!(matches!(
            events.try_recv(),
            Ok(StoreEvent::MessageMerged { .. })
        ));
        assert!(events.try_recv().is_err());
        assert_eq!(store.message_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn delete_emits_the_advisory_event() -> eyre::Result<()> {
        let store = MemoryStore::new();
        store
            .merge_id_registry_event(custody(1), MergeSource::SyncEngine)
            .await?;
        store
            .merge_message(cast(1, 1000, b"ab"), MergeSource::SyncEngine)
            .await?;

        let mut events = store.subscribe();
        assert!(store.delete_message(b"ab"));
        assert!(matches!(
            events.try_recv(),
            Ok(StoreEvent::MessageDeleted { .. })
        ));
        assert!(!store.delete_message(b"ab"));
        Ok(())
    }

    #[tokio::test]
    async fn replay_yields_every_message() -> eyre::Result<()> {
        let store = MemoryStore::new();
        store
            .merge_id_registry_event(custody(1), MergeSource::SyncEngine)
            .await?;
        for (ts, hash) in [(1000, b"ab".as_slice()), (1001, b"cd"), (1002, b"ef")] {
            store
                .merge_message(cast(1, ts, hash), MergeSource::SyncEngine)
                .await?;
        }

        let mut stream = store.for_each_message();
        let mut seen = 0;
        while let Some(message) = stream.next().await {
            let _ = message?;
            seen += 1;
        }
        assert_eq!(seen, 3);
        Ok(())
    }
}
