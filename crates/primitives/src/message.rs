use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Farcaster user identifier. Opaque bytes on the wire; numeric fids are
/// encoded big-endian so that derived keys sort in registration order.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Fid(Vec<u8>);

impl Fid {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u64> for Fid {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes().to_vec())
    }
}

impl From<&[u8]> for Fid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum MessageType {
    CastAdd,
    CastRemove,
    ReactionAdd,
    ReactionRemove,
    AmpAdd,
    AmpRemove,
    VerificationAdd,
    VerificationRemove,
    SignerAdd,
    SignerRemove,
    UserDataAdd,
}

impl MessageType {
    /// Signer messages gate every other message a user emits; the sync
    /// engine fetches them first during dependency recovery.
    pub fn is_signer(self) -> bool {
        matches!(self, Self::SignerAdd | Self::SignerRemove)
    }
}

/// Typed payload of a message. Only the fields the sync core inspects are
/// modelled; full bodies live with the storage engine.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum MessageBody {
    Cast { text: String },
    Reaction { target_hash: Vec<u8> },
    Amp { target_fid: Fid },
    Verification { address: Vec<u8> },
    Signer { signer: Vec<u8> },
    UserData { key: String, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MessageData {
    pub fid: Fid,
    /// Seconds since the Farcaster epoch.
    pub timestamp: u64,
    pub message_type: MessageType,
    pub body: MessageBody,
}

/// A signed user message as it travels over gossip and RPC.
///
/// `data` and `hash` are optional at this layer because unvalidated wire
/// input may lack either; consumers that need them (the trie key derivation
/// above all) fail with `bad_input` instead of panicking.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Message {
    pub data: Option<MessageData>,
    pub hash: Vec<u8>,
    pub signature: Vec<u8>,
    pub signer: Vec<u8>,
}

impl Message {
    pub fn fid(&self) -> Option<&Fid> {
        self.data.as_ref().map(|data| &data.fid)
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.data.as_ref().map(|data| data.timestamp)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.data.as_ref().map(|data| data.message_type)
    }
}
