use serde::{Deserialize, Serialize};

use crate::node::{NodeMetadata, TrieNode};
use crate::sync_id::SyncId;

/// Immutable commitment to the trie below a timestamp boundary.
///
/// `excluded_hashes[i]` commits to everything under the depth-`i` node on
/// the prefix path except the final on-path segment: the current,
/// still-unsettled timestamp bucket. Two hubs whose lists are equal hold
/// the same message set up to the snapshot boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrieSnapshot {
    pub prefix: Vec<u8>,
    pub num_messages: usize,
    pub excluded_hashes: Vec<String>,
}

/// The trie proper: a root node plus the operations the sync engine and
/// the server surface need. Writes are infallible for well-formed ids and
/// reads are total; an unknown prefix is an absent value, not an error.
#[derive(Clone, Debug, Default)]
pub struct MerkleTrie {
    root: TrieNode,
}

impl MerkleTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the id was not present before.
    pub fn insert(&mut self, id: &SyncId) -> bool {
        self.root.insert(id.as_bytes(), 0)
    }

    /// Returns true when the id was present.
    pub fn delete(&mut self, id: &SyncId) -> bool {
        self.root.delete(id.as_bytes(), 0)
    }

    pub fn exists(&self, id: &SyncId) -> bool {
        self.root.exists(id.as_bytes(), 0)
    }

    pub fn items(&self) -> usize {
        self.root.items()
    }

    pub fn root_hash(&self) -> String {
        self.root.hash().to_owned()
    }

    pub fn get_trie_node_metadata(&self, prefix: &[u8]) -> Option<NodeMetadata> {
        self.root.get_node(prefix).map(|node| node.metadata(prefix))
    }

    /// All sync ids under `prefix`, ascending. Empty when the prefix is
    /// unknown.
    pub fn get_all_values(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.root
            .get_node(prefix)
            .map(TrieNode::get_all_values)
            .unwrap_or_default()
    }

    /// Takes the snapshot at `prefix`: walks the path collecting the
    /// chained excluded hash at every depth, bottom-up, with the on-path
    /// child omitted at the deepest step.
    pub fn get_snapshot(&self, prefix: &[u8]) -> TrieSnapshot {
        let mut path_nodes: Vec<Option<&TrieNode>> = Vec::with_capacity(prefix.len());
        let mut current = Some(&self.root);
        for byte in prefix {
            path_nodes.push(current);
            current = current.and_then(|node| node.child(*byte));
        }

        let mut excluded_hashes = vec![String::new(); prefix.len()];
        let mut below: Option<String> = None;
        for i in (0..prefix.len()).rev() {
            let hash = match path_nodes[i] {
                Some(node) => node.excluded_hash(prefix[i], below.as_deref()),
                None => TrieNode::absent_excluded_hash(prefix[i], below.as_deref()),
            };
            excluded_hashes[i] = hash.clone();
            below = Some(hash);
        }

        TrieSnapshot {
            prefix: prefix.to_vec(),
            num_messages: current.map_or(0, TrieNode::items),
            excluded_hashes,
        }
    }

    /// Longest prefix of `prefix` on which our excluded hashes agree with
    /// the peer's, element-wise over the leading positions. Empty when the
    /// first position already differs; the full prefix when every position
    /// matches (the peer is ahead only in the final segment). Lists of
    /// unequal length are compared up to the shorter one.
    pub fn get_divergence_prefix(&self, prefix: &[u8], their_excluded_hashes: &[String]) -> Vec<u8> {
        let ours = self.get_snapshot(prefix).excluded_hashes;
        let shared = ours.len().min(their_excluded_hashes.len());

        for i in 0..shared {
            if ours[i] != their_excluded_hashes[i] {
                return prefix[..i].to_vec();
            }
        }
        prefix[..shared].to_vec()
    }
}
