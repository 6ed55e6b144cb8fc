use core::time::Duration;

use hub_primitives::HubError;
use libp2p::PeerId;
use serde::{Deserialize, Serialize};

/// How often a hub republishes its contact record.
pub const GOSSIP_CONTACT_INTERVAL: Duration = Duration::from_millis(10_000);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GossipAddressInfo {
    pub address: String,
    pub port: u16,
}

/// What a hub advertises about itself: where to reach it, how many
/// messages it holds, and the snapshot commitment receivers feed into
/// `should_sync` to decide whether reconciliation is worth a round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoContent {
    pub peer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gossip_address: Option<GossipAddressInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_address: Option<GossipAddressInfo>,
    pub excluded_hashes: Vec<String>,
    pub count: u64,
}

impl ContactInfoContent {
    /// The advertised peer id as a libp2p identity. Records travel as
    /// strings, so a malformed id surfaces only when someone dials.
    pub fn peer(&self) -> Result<PeerId, HubError> {
        self.peer_id
            .parse()
            .map_err(|_| HubError::BadInput(format!("invalid peer id: {}", self.peer_id)))
    }
}
