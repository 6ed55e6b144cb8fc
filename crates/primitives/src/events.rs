use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::message::Fid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum IdRegistryEventType {
    Register,
    Transfer,
}

/// On-chain custody event for a fid. Merging one makes the fid known to the
/// local storage engine, which in turn unblocks merging the fid's messages.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct IdRegistryEvent {
    pub fid: Fid,
    pub custody_address: Vec<u8>,
    pub event_type: IdRegistryEventType,
    pub block_number: u64,
}
