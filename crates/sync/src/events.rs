use serde::{Deserialize, Serialize};

/// Lifecycle record for one reconciliation round, for observers that want
/// to watch sync progress without scraping logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Identity of the peer the round ran against.
    pub peer_id: String,
    pub status: SyncStatus,
    pub duration_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Started,
    Completed { messages_synced: Option<usize> },
    Failed { error: String },
}

impl SyncEvent {
    pub fn started(peer_id: String) -> Self {
        Self {
            peer_id,
            status: SyncStatus::Started,
            duration_ms: None,
        }
    }

    pub fn completed(peer_id: String, messages_synced: Option<usize>, duration_ms: u64) -> Self {
        Self {
            peer_id,
            status: SyncStatus::Completed { messages_synced },
            duration_ms: Some(duration_ms),
        }
    }

    pub fn failed(peer_id: String, error: String, duration_ms: u64) -> Self {
        Self {
            peer_id,
            status: SyncStatus::Failed { error },
            duration_ms: Some(duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_carries_no_duration() {
        let event = SyncEvent::started("peer-a".to_owned());
        assert_eq!(event.peer_id, "peer-a");
        assert_eq!(event.status, SyncStatus::Started);
        assert!(event.duration_ms.is_none());
    }

    #[test]
    fn completed_records_the_message_count() {
        let event = SyncEvent::completed("peer-a".to_owned(), Some(42), 1000);
        assert_eq!(event.duration_ms, Some(1000));
        match event.status {
            SyncStatus::Completed { messages_synced } => {
                assert_eq!(messages_synced, Some(42));
            }
            _ => panic!("expected Completed status"),
        }
    }

    #[test]
    fn failed_carries_the_error() {
        let event = SyncEvent::failed("peer-a".to_owned(), "timeout".to_owned(), 2000);
        assert_eq!(event.duration_ms, Some(2000));
        match event.status {
            SyncStatus::Failed { error } => assert_eq!(error, "timeout"),
            _ => panic!("expected Failed status"),
        }
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = SyncEvent::completed("peer-a".to_owned(), Some(7), 350);
        let json = serde_json::to_string(&event).unwrap();
        let decoded: SyncEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
