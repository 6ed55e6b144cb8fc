//! Gossip wire types.
//!
//! The swarm itself lives outside this workspace; these are the value
//! types every hub must agree on: the JSON envelope, the two topics, and
//! the contact record peers republish every ten seconds to advertise what
//! they hold.

mod contact;
mod protocol;

pub use contact::{ContactInfoContent, GossipAddressInfo, GOSSIP_CONTACT_INTERVAL};
pub use protocol::{
    contact_topic, primary_topic, GossipContent, GossipMessage, GossipVersion,
    GOSSIP_TOPIC_CONTACT, GOSSIP_TOPIC_PRIMARY,
};
