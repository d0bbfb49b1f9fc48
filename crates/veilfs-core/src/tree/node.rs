//! Arena-backed decrypted tree.
//!
//! Nodes are addressed by [`NodeId`]. A node owns its children through the
//! arena; the parent link is a plain id used for walking upwards (physical
//! path construction, detaching) and never keeps anything alive.

use std::ops::Index;
use std::path::{Path, PathBuf};

use crate::fs::kind::NodeType;

/// Logical path of the root node.
pub const ROOT_LOGICAL: &str = "root";

/// Handle to a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node of the decrypted logical tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Capability bits (`ROOT`, `DIR`, or a single content kind).
    pub kind: NodeType,
    /// Ciphertext name of this entry on disk (the root label for the root).
    pub physical_segment: String,
    /// `root` for the root, otherwise `parent.logical_path + "/" + name`.
    pub logical_path: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl Node {
    /// The decrypted name of this entry (`root` for the root).
    pub fn name(&self) -> &str {
        self.logical_path
            .rsplit_once('/')
            .map_or(self.logical_path.as_str(), |(_, name)| name)
    }
}

/// Owns every node of one storage instance's tree.
#[derive(Debug)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl NodeArena {
    /// Create an arena holding only the root node.
    pub fn new(root_label: impl Into<String>) -> Self {
        let root = Node {
            kind: NodeType::ROOT,
            physical_segment: root_label.into(),
            logical_path: ROOT_LOGICAL.to_string(),
            children: Vec::new(),
            parent: None,
        };
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a child under `parent` named `name` (the decrypted segment).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        kind: NodeType,
        physical_segment: impl Into<String>,
        name: &str,
    ) -> NodeId {
        debug_assert!(!kind.contains(NodeType::ROOT), "only the arena root may be ROOT");

        let logical_path = format!("{}/{name}", self[parent].logical_path);
        let node = Node {
            kind,
            physical_segment: physical_segment.into(),
            logical_path,
            children: Vec::new(),
            parent: Some(parent),
        };

        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        };

        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Reclassify a node, e.g. after a rename changed its extension.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeType) {
        if let Some(node) = self.get_mut(id) {
            node.kind = kind;
        }
    }

    /// Direct child of `parent` with the given decrypted name.
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self[child].name() == name)
    }

    /// Remove `id` and its whole subtree. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        let Some(parent) = self.get(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.slots[current.0].take() {
                stack.extend(node.children);
                self.free.push(current.0);
            }
        }
    }

    /// Move `id` under `new_parent` with a new physical segment and name.
    ///
    /// Logical paths of the whole moved subtree are rewritten. Descendants keep
    /// their physical segments: the filesystem moves them along with `id`.
    pub fn relocate(&mut self, id: NodeId, new_parent: NodeId, physical_segment: String, name: &str) {
        let old_parent = self[id].parent;
        if let Some(old) = old_parent.and_then(|p| self.get_mut(p)) {
            old.children.retain(|&child| child != id);
        }
        if let Some(parent_node) = self.get_mut(new_parent) {
            parent_node.children.push(id);
        }

        let logical_path = format!("{}/{name}", self[new_parent].logical_path);
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(new_parent);
            node.physical_segment = physical_segment;
            node.logical_path = logical_path;
        }
        self.rewrite_descendant_paths(id);
    }

    fn rewrite_descendant_paths(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let prefix = self[current].logical_path.clone();
            let children = self[current].children.clone();
            for child in children {
                if let Some(node) = self.get_mut(child) {
                    let name = node.name().to_string();
                    node.logical_path = format!("{prefix}/{name}");
                }
                stack.push(child);
            }
        }
    }

    /// True if `candidate` is `ancestor` or lies below it.
    pub fn is_within(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Physical location of `id` below `base_dir`, built from the parent chain.
    pub fn physical_path(&self, id: NodeId, base_dir: &Path) -> PathBuf {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.get(c)) {
            segments.push(node.physical_segment.as_str());
            current = node.parent;
        }

        let mut path = base_dir.to_path_buf();
        path.extend(segments.into_iter().rev());
        path
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id).unwrap_or_else(|| panic!("stale node id {id:?}"))
    }
}
