use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Wire-visible projection of a trie node. Children carry their own prefix,
/// count and hash but empty child maps; a peer recurses by asking for each
/// child prefix in turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub prefix: Vec<u8>,
    pub num_messages: usize,
    pub hash: String,
    pub children: BTreeMap<u8, NodeMetadata>,
}

/// One radix-trie node: children keyed by byte, a 160-bit commitment to the
/// multiset of sync ids beneath it, the subtree item count, and (at full
/// key depth only) the stored id itself.
///
/// `children` is a `BTreeMap` so iteration is deterministic in ascending
/// byte order, which the hash computation requires.
#[derive(Clone, Debug)]
pub struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    hash: String,
    items: usize,
    value: Option<Vec<u8>>,
}

impl Default for TrieNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieNode {
    pub fn new() -> Self {
        let mut node = Self {
            children: BTreeMap::new(),
            hash: String::new(),
            items: 0,
            value: None,
        };
        node.recompute();
        node
    }

    pub fn items(&self) -> usize {
        self.items
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some() && self.children.is_empty()
    }

    pub fn child(&self, byte: u8) -> Option<&TrieNode> {
        self.children.get(&byte)
    }

    /// Hash of a node holding nothing. Snapshot walks use it when a prefix
    /// runs past the materialized trie.
    pub fn empty_hash() -> String {
        hex::encode(Sha1::digest(b""))
    }

    /// Inserts `id` beneath this node, which sits at depth `index` of the
    /// id. Returns true when the id was not present before, so each
    /// ancestor updates its count exactly once.
    pub fn insert(&mut self, id: &[u8], index: usize) -> bool {
        if index == id.len() {
            if self.value.is_some() {
                return false;
            }
            self.value = Some(id.to_vec());
            self.recompute();
            return true;
        }

        let child = self.children.entry(id[index]).or_default();
        let inserted = child.insert(id, index + 1);
        if inserted {
            self.recompute();
        }
        inserted
    }

    /// Symmetric descent; prunes any child left empty. Returns true when
    /// the id was present.
    pub fn delete(&mut self, id: &[u8], index: usize) -> bool {
        if index == id.len() {
            if self.value.take().is_none() {
                return false;
            }
            self.recompute();
            return true;
        }

        let byte = id[index];
        let Some(child) = self.children.get_mut(&byte) else {
            return false;
        };

        let deleted = child.delete(id, index + 1);
        if deleted {
            if child.items == 0 {
                let _ = self.children.remove(&byte);
            }
            self.recompute();
        }
        deleted
    }

    pub fn exists(&self, id: &[u8], index: usize) -> bool {
        if index == id.len() {
            return self.value.as_deref() == Some(id);
        }
        self.children
            .get(&id[index])
            .is_some_and(|child| child.exists(id, index + 1))
    }

    /// Follows `prefix` down from this node.
    pub fn get_node(&self, prefix: &[u8]) -> Option<&TrieNode> {
        let mut node = self;
        for byte in prefix {
            node = node.children.get(byte)?;
        }
        Some(node)
    }

    /// Every stored id in this subtree, ascending. Ascending byte paths
    /// mean ascending sync ids, i.e. chronological order.
    pub fn get_all_values(&self) -> Vec<Vec<u8>> {
        let mut values = Vec::with_capacity(self.items);
        self.collect_values(&mut values);
        values
    }

    fn collect_values(&self, out: &mut Vec<Vec<u8>>) {
        if let Some(value) = &self.value {
            out.push(value.clone());
        }
        for child in self.children.values() {
            child.collect_values(out);
        }
    }

    pub fn metadata(&self, prefix: &[u8]) -> NodeMetadata {
        let children = self
            .children
            .iter()
            .map(|(byte, child)| {
                let mut child_prefix = prefix.to_vec();
                child_prefix.push(*byte);
                (
                    *byte,
                    NodeMetadata {
                        prefix: child_prefix,
                        num_messages: child.items,
                        hash: child.hash.clone(),
                        children: BTreeMap::new(),
                    },
                )
            })
            .collect();

        NodeMetadata {
            prefix: prefix.to_vec(),
            num_messages: self.items,
            hash: self.hash.clone(),
            children,
        }
    }

    /// Commitment to this subtree with the path through `path_byte`
    /// replaced by `below`, or omitted entirely when `below` is `None`,
    /// which is how the deepest snapshot step excludes the unsettled
    /// segment. Chaining these bottom-up yields the snapshot's excluded
    /// hashes: entry `i` commits to everything under the depth-`i` node
    /// except the final on-path subtree.
    pub fn excluded_hash(&self, path_byte: u8, below: Option<&str>) -> String {
        let mut hasher = Sha1::new();
        let mut path_emitted = false;

        // The chained contribution keeps the path byte's canonical sorted
        // position whether or not that child is materialized, so absent and
        // empty paths commit identically.
        for (byte, child) in &self.children {
            if *byte > path_byte && !path_emitted {
                if let Some(below) = below {
                    hasher.update([path_byte]);
                    hasher.update(below.as_bytes());
                }
                path_emitted = true;
            }
            if *byte == path_byte {
                if let Some(below) = below {
                    hasher.update([*byte]);
                    hasher.update(below.as_bytes());
                }
                path_emitted = true;
                continue;
            }
            hasher.update([*byte]);
            hasher.update(child.hash.as_bytes());
        }
        if !path_emitted {
            if let Some(below) = below {
                hasher.update([path_byte]);
                hasher.update(below.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Chained excluded hash for a position the trie does not materialize.
    pub fn absent_excluded_hash(path_byte: u8, below: Option<&str>) -> String {
        let mut hasher = Sha1::new();
        if let Some(below) = below {
            hasher.update([path_byte]);
            hasher.update(below.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Restores the node invariants after a mutation: `items` is the
    /// subtree count, `hash` commits to the multiset of ids beneath.
    /// A leaf hashes its value; an interior node hashes
    /// `child_byte || child_hash` over its children in ascending order.
    fn recompute(&mut self) {
        let mut hasher = Sha1::new();

        if let Some(value) = &self.value {
            if self.children.is_empty() {
                self.items = 1;
                hasher.update(value);
                self.hash = hex::encode(hasher.finalize());
                return;
            }
        }

        let mut items = usize::from(self.value.is_some());
        for (byte, child) in &self.children {
            items += child.items;
            hasher.update([*byte]);
            hasher.update(child.hash.as_bytes());
        }
        self.items = items;
        self.hash = hex::encode(hasher.finalize());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_commits_to_nothing() {
        let node = TrieNode::new();
        assert_eq!(node.items(), 0);
        assert_eq!(node.hash(), TrieNode::empty_hash());
    }

    #[test]
    fn insert_reports_novelty_once() {
        let mut node = TrieNode::new();
        assert!(node.insert(b"0000001000ab", 0));
        assert!(!node.insert(b"0000001000ab", 0));
        assert_eq!(node.items(), 1);
    }

    #[test]
    fn delete_prunes_empty_branches() {
        let mut node = TrieNode::new();
        let _ = node.insert(b"0000001000ab", 0);
        assert!(node.delete(b"0000001000ab", 0));
        assert_eq!(node.items(), 0);
        assert!(node.child(b'0').is_none());
    }

    #[test]
    fn leaf_hash_covers_the_value() {
        let mut node = TrieNode::new();
        let _ = node.insert(b"0000001000ab", 0);
        let leaf = node.get_node(b"0000001000ab").unwrap();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.hash(), hex::encode(Sha1::digest(b"0000001000ab")));
    }

    #[test]
    fn values_come_back_in_order() {
        let mut node = TrieNode::new();
        let _ = node.insert(b"0000001000cd", 0);
        let _ = node.insert(b"0000001000ab", 0);
        let _ = node.insert(b"0000000999zz", 0);
        let values = node.get_all_values();
        assert_eq!(
            values,
            vec![
                b"0000000999zz".to_vec(),
                b"0000001000ab".to_vec(),
                b"0000001000cd".to_vec(),
            ]
        );
    }

    #[test]
    fn metadata_lists_children_with_prefixes() {
        let mut node = TrieNode::new();
        let _ = node.insert(b"0000001000ab", 0);
        let _ = node.insert(b"0000002000cd", 0);
        let meta = node.get_node(b"000000").unwrap().metadata(b"000000");
        assert_eq!(meta.num_messages, 2);
        assert_eq!(meta.children.len(), 2);
        assert_eq!(meta.children[&b'1'].prefix, b"0000001".to_vec());
        assert_eq!(meta.children[&b'2'].num_messages, 1);
    }
}
