//! Serializable snapshots of the decrypted tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fs::kind::{NodeType, extension_of, type_table};
use crate::tree::node::{NodeArena, NodeId};

/// Plain nested copy of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    /// Capability bits, serialized as a number.
    pub kind: NodeType,
    /// Logical path (`root`, `root/docs`, ...).
    pub path: String,
    pub name: String,
    /// Lowercase extension for files, empty for directories.
    pub extension: String,
    /// Children sorted by name.
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn from_arena(arena: &NodeArena, id: NodeId) -> Self {
        let node = &arena[id];
        let mut children: Vec<NodeSnapshot> = node
            .children
            .iter()
            .map(|&child| NodeSnapshot::from_arena(arena, child))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let name = node.name().to_string();
        let extension = if node.kind.is_file() {
            extension_of(&name)
        } else {
            String::new()
        };

        NodeSnapshot {
            kind: node.kind,
            path: node.logical_path.clone(),
            name,
            extension,
            children,
        }
    }

    /// Locate a node in this snapshot by its logical path.
    pub fn find(&self, logical_path: &str) -> Option<&NodeSnapshot> {
        if self.path == logical_path {
            return Some(self);
        }
        self.children
            .iter()
            .filter(|child| {
                logical_path
                    .strip_prefix(child.path.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .find_map(|child| child.find(logical_path))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::count).sum::<usize>()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_crawlable()
    }
}

/// Tree snapshot plus the bit table needed to interpret node kinds.
#[derive(Debug, Clone, Serialize)]
pub struct TreeExport {
    pub tree: NodeSnapshot,
    pub types: BTreeMap<&'static str, u16>,
}

impl TreeExport {
    pub fn new(tree: NodeSnapshot) -> Self {
        Self {
            tree,
            types: type_table().into_iter().collect(),
        }
    }
}
