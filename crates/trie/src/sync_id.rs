use core::fmt;

use hub_primitives::{HubError, Message};

/// Width of the decimal timestamp prefix in a sync id.
pub const TIMESTAMP_LENGTH: usize = 10;

/// Compact, collision-resistant trie key for a message.
///
/// Layout: ten ASCII digits of the message's Farcaster timestamp
/// (zero-padded), then the raw message hash. Lexicographic order over the
/// bytes equals (timestamp, hash) order, so trie traversal yields ids in
/// chronological order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncId(Vec<u8>);

impl SyncId {
    pub fn new(timestamp: u64, hash: &[u8]) -> Self {
        let mut bytes = format!("{timestamp:0width$}", width = TIMESTAMP_LENGTH).into_bytes();
        bytes.extend_from_slice(hash);
        Self(bytes)
    }

    /// Derives the sync id for a message. A message without data (hence
    /// without a timestamp) or without a hash has no place in the trie.
    pub fn from_message(message: &Message) -> Result<Self, HubError> {
        let data = message
            .data
            .as_ref()
            .ok_or_else(|| HubError::BadInput("message has no data".to_owned()))?;

        if message.hash.is_empty() {
            return Err(HubError::BadInput("message has no hash".to_owned()));
        }

        Ok(Self::new(data.timestamp, &message.hash))
    }

    /// First `n` bytes of the id, clamped to its length. Used for snapshot
    /// prefixes and divergence walks.
    pub fn timestamp_prefix(&self, n: usize) -> &[u8] {
        &self.0[..n.min(self.0.len())]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<SyncId> for Vec<u8> {
    fn from(id: SyncId) -> Self {
        id.0
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use hub_primitives::{Fid, MessageBody, MessageData, MessageType};

    use super::*;

    fn message(timestamp: u64, hash: &[u8]) -> Message {
        Message {
            data: Some(MessageData {
                fid: Fid::from(1),
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

    #[test]
    fn timestamp_is_zero_padded_ascii() {
        let id = SyncId::from_message(&message(1000, b"ab")).unwrap();
        assert_eq!(id.as_bytes(), b"0000001000ab");
    }

    #[test]
    fn missing_data_is_bad_input() {
        let mut m = message(1000, b"ab");
        m.data = None;
        assert!(matches!(
            SyncId::from_message(&m),
            Err(HubError::BadInput(_))
        ));
    }

    #[test]
    fn missing_hash_is_bad_input() {
        let m = message(1000, b"");
        assert!(matches!(
            SyncId::from_message(&m),
            Err(HubError::BadInput(_))
        ));
    }

    #[test]
    fn ids_sort_by_timestamp_then_hash() {
        let a = SyncId::new(1000, b"ab");
        let b = SyncId::new(1000, b"cd");
        let c = SyncId::new(1001, b"aa");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn prefix_is_clamped() {
        let id = SyncId::new(1000, b"ab");
        assert_eq!(id.timestamp_prefix(7), b"0000001");
        assert_eq!(id.timestamp_prefix(64), id.as_bytes());
    }
}
