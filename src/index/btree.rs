use log::debug;

use crate::types::RecordId;

const DEFAULT_ORDER: usize = 5;

/// In-memory B-tree mapping string keys to record ids. Keys compare
/// lexicographically. All key/value pairs live in leaves; internal nodes
/// hold separator keys only, with keys >= a separator routed to the child
/// on its right. Nodes are kept in an index arena rather than linked with
/// parent references.
pub struct BTree {
    order: usize,
    nodes: Vec<Node>,
    root: usize,
}

struct Node {
    leaf: bool,
    keys: Vec<String>,
    values: Vec<RecordId>, // leaf payloads, parallel to keys
    children: Vec<usize>,
}

impl Node {
    fn new_leaf() -> Self {
        Self {
            leaf: true,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    fn new_internal() -> Self {
        Self {
            leaf: false,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    fn child_index(&self, key: &str) -> usize {
        self.keys.partition_point(|k| k.as_str() <= key)
    }
}

/// Separator key and new right sibling produced by a node split.
struct Split {
    separator: String,
    right: usize,
}

impl Default for BTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BTree {
    pub fn new() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }

    pub fn with_order(order: usize) -> Self {
        Self {
            order,
            nodes: vec![Node::new_leaf()],
            root: 0,
        }
    }

    pub fn search(&self, key: &str) -> Option<RecordId> {
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            if node.leaf {
                let result = node
                    .keys
                    .iter()
                    .position(|k| k == key)
                    .map(|pos| node.values[pos]);
                debug!(
                    "Search for key '{}': {}",
                    key,
                    if result.is_some() { "found" } else { "not found" }
                );
                return result;
            }
            current = node.children[node.child_index(key)];
        }
    }

    /// Inserts in sorted position, splitting full nodes on the way back up.
    /// Duplicate handling is the caller's responsibility; the table layer
    /// rejects duplicates on unique indexes before calling this.
    pub fn insert(&mut self, key: &str, value: RecordId) {
        if let Some(split) = self.insert_into(self.root, key, value) {
            let old_root = self.root;
            let mut new_root = Node::new_internal();
            new_root.keys.push(split.separator);
            new_root.children.push(old_root);
            new_root.children.push(split.right);
            self.nodes.push(new_root);
            self.root = self.nodes.len() - 1;
        }
        debug!("Inserted key '{}' with value {}", key, value);
    }

    fn insert_into(&mut self, node_idx: usize, key: &str, value: RecordId) -> Option<Split> {
        if self.nodes[node_idx].leaf {
            let node = &mut self.nodes[node_idx];
            let pos = node.keys.partition_point(|k| k.as_str() < key);
            node.keys.insert(pos, key.to_string());
            node.values.insert(pos, value);

            if node.keys.len() >= self.order - 1 {
                return Some(self.split_leaf(node_idx));
            }
            return None;
        }

        let child_pos = self.nodes[node_idx].child_index(key);
        let child_idx = self.nodes[node_idx].children[child_pos];
        let child_split = self.insert_into(child_idx, key, value)?;

        let node = &mut self.nodes[node_idx];
        node.keys.insert(child_pos, child_split.separator);
        node.children.insert(child_pos + 1, child_split.right);

        if node.keys.len() >= self.order - 1 {
            return Some(self.split_internal(node_idx));
        }
        None
    }

    /// Moves the upper half of a leaf into a new right sibling; the
    /// separator is a copy of the sibling's first key, so equal keys route
    /// right of it on descent.
    fn split_leaf(&mut self, node_idx: usize) -> Split {
        let mid = self.nodes[node_idx].keys.len() / 2;
        let mut right = Node::new_leaf();
        right.keys = self.nodes[node_idx].keys.split_off(mid);
        right.values = self.nodes[node_idx].values.split_off(mid);
        let separator = right.keys[0].clone();

        self.nodes.push(right);
        Split {
            separator,
            right: self.nodes.len() - 1,
        }
    }

    /// Promotes the median key out of an internal node; the halves keep the
    /// keys on either side of it.
    fn split_internal(&mut self, node_idx: usize) -> Split {
        let mid = self.nodes[node_idx].keys.len() / 2;
        let mut right = Node::new_internal();
        right.keys = self.nodes[node_idx].keys.split_off(mid + 1);
        right.children = self.nodes[node_idx].children.split_off(mid + 1);
        let separator = self.nodes[node_idx].keys.pop().expect("median key");

        self.nodes.push(right);
        Split {
            separator,
            right: self.nodes.len() - 1,
        }
    }

    /// Removes the key from its leaf if present. No rebalancing: nodes may
    /// underflow and stale separators may remain, neither of which affects
    /// search correctness.
    pub fn delete(&mut self, key: &str) -> bool {
        let mut current = self.root;
        loop {
            if self.nodes[current].leaf {
                let node = &mut self.nodes[current];
                if let Some(pos) = node.keys.iter().position(|k| k == key) {
                    node.keys.remove(pos);
                    node.values.remove(pos);
                    debug!("Deleted key '{}'", key);
                    return true;
                }
                return false;
            }
            current = self.nodes[current].children[self.nodes[current].child_index(key)];
        }
    }

    pub fn len(&self) -> usize {
        self.count_keys(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count_keys(&self, node_idx: usize) -> usize {
        let node = &self.nodes[node_idx];
        if node.leaf {
            node.keys.len()
        } else {
            node.children.iter().map(|c| self.count_keys(*c)).sum()
        }
    }

    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while !self.nodes[current].leaf {
            current = self.nodes[current].children[0];
            height += 1;
        }
        height
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_keys(self.root, &mut out);
        out
    }

    fn collect_keys(&self, node_idx: usize, out: &mut Vec<String>) {
        let node = &self.nodes[node_idx];
        if node.leaf {
            out.extend(node.keys.iter().cloned());
        } else {
            for child in &node.children {
                self.collect_keys(*child, out);
            }
        }
    }
}
