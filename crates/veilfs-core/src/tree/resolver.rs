//! Logical → physical path resolution.
//!
//! Physical names are randomized ciphertext, so a logical path is resolved by
//! walking the decrypted tree to the deepest known node and minting fresh
//! ciphertext only for the segments beyond it.
//!
//! [`find`] returns a *prefix* match. Operations that refer to an existing
//! object (read, delete, rename source) must check [`ResolvedPath::exact`]
//! or call [`ResolvedPath::require_exact`]; an ancestor is never a hit.

use std::fmt;
use std::path::PathBuf;

use relative_path::{Component, RelativePath, RelativePathBuf};
use tracing::trace;

use crate::crypto::SegmentCodec;
use crate::error::StorageError;
use crate::tree::node::{NodeArena, NodeId, ROOT_LOGICAL};

/// Normalized user-facing path inside a principal's tree.
///
/// Uses `/` as separator, has no leading or trailing separator, and contains
/// no `.`, `..` or empty segments. The root is the empty path.
///
/// # Examples
///
/// ```
/// use veilfs_core::tree::resolver::LogicalPath;
///
/// let path = LogicalPath::parse("/docs/./drafts/../report.txt");
/// assert_eq!(path.as_str(), "docs/report.txt");
/// assert_eq!(path.tree_path(), "root/docs/report.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath(RelativePathBuf);

impl LogicalPath {
    #[inline]
    pub fn root() -> Self {
        LogicalPath(RelativePathBuf::new())
    }

    /// Parse and normalize a caller-supplied path.
    pub fn parse(path: impl AsRef<str>) -> Self {
        LogicalPath(RelativePathBuf::from(normalize_path(path.as_ref())))
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.components().map(|c| c.as_str())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    pub fn parent(&self) -> Option<LogicalPath> {
        if self.is_root() {
            return None;
        }
        self.0.parent().map(|p| LogicalPath(p.to_relative_path_buf()))
    }

    /// Join and re-normalize, so `..` in `tail` cannot climb above the root.
    pub fn join(&self, tail: impl AsRef<str>) -> LogicalPath {
        LogicalPath::parse(format!("{}/{}", self.as_str(), tail.as_ref()))
    }

    /// The path as stored in node logical paths (`root` or `root/...`).
    pub fn tree_path(&self) -> String {
        if self.is_root() {
            ROOT_LOGICAL.to_string()
        } else {
            format!("{ROOT_LOGICAL}/{}", self.as_str())
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Collapse `.` and `..` segments.
///
/// `.` and empty segments are dropped; `..` removes the segment before it and
/// is ignored when there is nothing left to remove.
pub fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in RelativePath::new(path.trim_start_matches('/')).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(segment) => stack.push(segment),
        }
    }
    stack.join("/")
}

/// A segment beyond the deepest known node, with its freshly minted ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedSegment {
    pub name: String,
    pub physical: String,
}

/// Outcome of [`deep_path`].
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// Deepest existing node whose logical path is a prefix of the target.
    pub node: NodeId,
    /// True when `node` is the target itself.
    pub exact: bool,
    /// Physical location of the target.
    pub physical_file: PathBuf,
    /// Segments that did not exist yet, in order, with their new physical names.
    pub minted: Vec<MintedSegment>,
}

impl ResolvedPath {
    /// The existing node for `path`, or `NotFound` if only an ancestor matched.
    pub fn require_exact(&self, path: &LogicalPath) -> Result<NodeId, StorageError> {
        if self.exact {
            Ok(self.node)
        } else {
            Err(StorageError::not_found(path.as_str()))
        }
    }
}

/// Deepest node whose logical path is a component-wise prefix of `target`.
///
/// `target` is a tree path (`root/...`). A child matches when `target` equals
/// its logical path or continues it with `/`, so `root/docs2` never matches
/// `root/docs`. Siblings sharing a name (two physical directories that decrypt
/// alike) are all searched; the earliest one wins a tie.
pub fn find(arena: &NodeArena, target: &str) -> NodeId {
    deepest_match(arena, arena.root(), target).0
}

/// Deepest match below `from`, with its depth relative to `from`.
fn deepest_match(arena: &NodeArena, from: NodeId, target: &str) -> (NodeId, usize) {
    let mut best = (from, 0);
    for &child in &arena[from].children {
        let logical = arena[child].logical_path.as_str();
        let matches = target
            .strip_prefix(logical)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if matches {
            trace!(logical = %logical, "Descending into matching child");
            let (node, depth) = deepest_match(arena, child, target);
            if depth + 1 > best.1 {
                best = (node, depth + 1);
            }
        }
    }
    best
}

/// Exact lookup without minting any ciphertext.
pub fn lookup(arena: &NodeArena, path: &LogicalPath) -> Option<NodeId> {
    let target = path.tree_path();
    let node = find(arena, &target);
    (arena[node].logical_path == target).then_some(node)
}

/// Resolve `path` to its physical location, minting ciphertext for new segments.
///
/// `encrypt_segment` is called exactly once per segment beyond the deepest
/// existing node; existing segments reuse their discovered physical names.
pub fn deep_path(
    arena: &NodeArena,
    codec: &SegmentCodec,
    base_dir: &std::path::Path,
    path: &LogicalPath,
) -> ResolvedPath {
    let target = path.tree_path();
    let node = find(arena, &target);
    let exact = arena[node].logical_path == target;

    // Components resolved so far, not counting the root label
    let depth = arena[node].logical_path.split('/').count() - 1;

    let minted: Vec<MintedSegment> = path
        .components()
        .skip(depth)
        .map(|name| MintedSegment {
            name: name.to_string(),
            physical: codec.encrypt_segment(name),
        })
        .collect();

    let mut physical_file = arena.physical_path(node, base_dir);
    physical_file.extend(minted.iter().map(|m| m.physical.as_str()));

    trace!(
        path = %path,
        depth,
        minted = minted.len(),
        exact,
        "Resolved logical path"
    );

    ResolvedPath {
        node,
        exact,
        physical_file,
        minted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::kind::NodeType;
    use std::path::Path;

    fn codec() -> SegmentCodec {
        SegmentCodec::from_secret("secret", "No-salt")
    }

    fn sample_arena() -> NodeArena {
        let mut arena = NodeArena::new("label");
        let root = arena.root();
        let docs = arena.insert_child(root, NodeType::DIR, "p-docs", "docs");
        arena.insert_child(docs, NodeType::RAW, "p-a", "a.txt");
        arena.insert_child(root, NodeType::DIR, "p-doc", "doc");
        arena
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b/c"), "a/b/c");
        assert_eq!(normalize_path("/a/b/"), "a/b");
        assert_eq!(normalize_path("a/./b"), "a/b");
        assert_eq!(normalize_path("a/b/../c"), "a/c");
        assert_eq!(normalize_path("../../a"), "a");
        assert_eq!(normalize_path("a/../../b"), "b");
        assert_eq!(normalize_path("a//b"), "a/b");
        assert_eq!(normalize_path(".."), "");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_logical_path_helpers() {
        let path = LogicalPath::parse("docs/notes/a.txt");
        assert_eq!(path.file_name(), Some("a.txt"));
        assert_eq!(path.parent().unwrap().as_str(), "docs/notes");
        assert_eq!(path.components().count(), 3);
        assert_eq!(path.tree_path(), "root/docs/notes/a.txt");

        assert!(LogicalPath::parse("/").is_root());
        assert_eq!(LogicalPath::root().tree_path(), "root");
        assert_eq!(LogicalPath::root().parent(), None);
        assert_eq!(LogicalPath::root().to_string(), "/");
    }

    #[test]
    fn test_join_cannot_escape_root() {
        let parent = LogicalPath::parse("docs");
        assert_eq!(parent.join("b.txt").as_str(), "docs/b.txt");
        assert_eq!(parent.join("../b.txt").as_str(), "b.txt");
        assert_eq!(parent.join("../../../b.txt").as_str(), "b.txt");
    }

    #[test]
    fn test_find_exact_and_prefix() {
        let arena = sample_arena();
        let a = find(&arena, "root/docs/a.txt");
        assert_eq!(arena[a].logical_path, "root/docs/a.txt");

        let deeper = find(&arena, "root/docs/new/file.txt");
        assert_eq!(arena[deeper].logical_path, "root/docs");

        assert_eq!(find(&arena, "root"), arena.root());
    }

    #[test]
    fn test_find_does_not_match_partial_component() {
        let arena = sample_arena();
        // "docs2" shares a string prefix with "docs" and "doc" but is neither
        assert_eq!(find(&arena, "root/docs2"), arena.root());
        assert_eq!(find(&arena, "root/docs2/x.txt"), arena.root());
        let doc = find(&arena, "root/doc");
        assert_eq!(arena[doc].logical_path, "root/doc");
    }

    #[test]
    fn test_find_searches_same_named_siblings() {
        let mut arena = NodeArena::new("label");
        let root = arena.root();
        let first = arena.insert_child(root, NodeType::DIR, "p1", "docs");
        arena.insert_child(first, NodeType::RAW, "p2", "x.txt");
        let second = arena.insert_child(root, NodeType::DIR, "p3", "docs");
        let y = arena.insert_child(second, NodeType::RAW, "p4", "y.txt");

        assert_eq!(find(&arena, "root/docs/y.txt"), y);
        assert_eq!(find(&arena, "root/docs"), first);
        assert_eq!(find(&arena, "root/docs/new.txt"), first);
        assert_eq!(
            arena.physical_path(find(&arena, "root/docs/y.txt"), Path::new("/b")),
            PathBuf::from("/b/label/p3/p4")
        );
    }

    #[test]
    fn test_deep_path_existing() {
        let arena = sample_arena();
        let resolved = deep_path(&arena, &codec(), Path::new("/b"), &LogicalPath::parse("docs/a.txt"));

        assert!(resolved.exact);
        assert!(resolved.minted.is_empty());
        assert_eq!(resolved.physical_file, PathBuf::from("/b/label/p-docs/p-a"));
    }

    #[test]
    fn test_deep_path_mints_only_missing_segments() {
        let arena = sample_arena();
        let codec = codec();
        let resolved = deep_path(&arena, &codec, Path::new("/b"), &LogicalPath::parse("docs/x/y.txt"));

        assert!(!resolved.exact);
        assert_eq!(arena[resolved.node].logical_path, "root/docs");
        let names: Vec<_> = resolved.minted.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y.txt"]);
        for minted in &resolved.minted {
            assert_eq!(codec.decrypt_segment(&minted.physical).unwrap(), minted.name);
        }

        let expected_file = PathBuf::from("/b/label/p-docs")
            .join(&resolved.minted[0].physical)
            .join(&resolved.minted[1].physical);
        assert_eq!(resolved.physical_file, expected_file);
    }

    #[test]
    fn test_require_exact() {
        let arena = sample_arena();
        let codec = codec();
        let base = Path::new("/b");

        let hit = deep_path(&arena, &codec, base, &LogicalPath::parse("docs"));
        assert!(hit.require_exact(&LogicalPath::parse("docs")).is_ok());

        let path = LogicalPath::parse("docs2");
        let miss = deep_path(&arena, &codec, base, &path);
        assert!(matches!(miss.require_exact(&path), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn test_lookup() {
        let arena = sample_arena();
        assert!(lookup(&arena, &LogicalPath::parse("docs/a.txt")).is_some());
        assert!(lookup(&arena, &LogicalPath::parse("docs/b.txt")).is_none());
        assert_eq!(lookup(&arena, &LogicalPath::root()), Some(arena.root()));
    }

    #[test]
    fn test_deep_path_root() {
        let arena = sample_arena();
        let resolved = deep_path(&arena, &codec(), Path::new("/b"), &LogicalPath::root());
        assert!(resolved.exact);
        assert_eq!(resolved.node, arena.root());
        assert_eq!(resolved.physical_file, PathBuf::from("/b/label"));
    }
}
