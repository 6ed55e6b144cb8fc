use hub_primitives::{HubError, IdRegistryEvent, Message};
use libp2p::gossipsub::IdentTopic;
use serde::{Deserialize, Serialize};

use crate::contact::ContactInfoContent;

/// Messages and id-registry events travel here.
pub const GOSSIP_TOPIC_PRIMARY: &str = "f_network_topic_primary";
/// Contact records travel here.
pub const GOSSIP_TOPIC_CONTACT: &str = "f_network_topic_contact";

pub fn primary_topic() -> IdentTopic {
    IdentTopic::new(GOSSIP_TOPIC_PRIMARY)
}

pub fn contact_topic() -> IdentTopic {
    IdentTopic::new(GOSSIP_TOPIC_CONTACT)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipVersion {
    V1,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GossipContent {
    Message(Message),
    IdRegistryEvent(IdRegistryEvent),
    ContactInfo(ContactInfoContent),
}

/// The envelope every gossiped payload rides in: JSON-encoded UTF-8 bytes
/// carrying the content, the topics it targets, and the protocol version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GossipMessage {
    pub content: GossipContent,
    pub topics: Vec<String>,
    pub version: GossipVersion,
}

impl GossipMessage {
    pub fn message(message: Message) -> Self {
        Self {
            content: GossipContent::Message(message),
            topics: vec![GOSSIP_TOPIC_PRIMARY.to_owned()],
            version: GossipVersion::V1,
        }
    }

    pub fn id_registry_event(event: IdRegistryEvent) -> Self {
        Self {
            content: GossipContent::IdRegistryEvent(event),
            topics: vec![GOSSIP_TOPIC_PRIMARY.to_owned()],
            version: GossipVersion::V1,
        }
    }

    pub fn contact_info(contact: ContactInfoContent) -> Self {
        Self {
            content: GossipContent::ContactInfo(contact),
            topics: vec![GOSSIP_TOPIC_CONTACT.to_owned()],
            version: GossipVersion::V1,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, HubError> {
        serde_json::to_vec(self)
            .map_err(|err| HubError::Unknown(format!("failed to encode gossip envelope: {err}")))
    }

    /// A payload that does not parse is `bad_input`, never a panic;
    /// gossip delivers arbitrary bytes from arbitrary peers.
    pub fn decode(bytes: &[u8]) -> Result<Self, HubError> {
        serde_json::from_slice(bytes)
            .map_err(|err| HubError::BadInput(format!("invalid gossip envelope: {err}")))
    }
}
