//! Encrypted tree storage engine.
//!
//! [`Storage`] is one principal's view of the shared storage directory. Every
//! public operation first makes sure the physical tree has been crawled (once,
//! lazily), then resolves the logical path against the decrypted tree, performs
//! the physical effect, and updates the tree to match.
//!
//! # Key Methods
//!
//! - **Snapshot**: [`tree`](Storage::tree), [`export`](Storage::export)
//! - **Read**: [`read_file`](Storage::read_file), [`read_view`](Storage::read_view)
//! - **Write**: [`write_file`](Storage::write_file), [`write_new`](Storage::write_new),
//!   [`create_dir`](Storage::create_dir), [`write`](Storage::write), [`upload`](Storage::upload)
//! - **Mutate**: [`delete`](Storage::delete), [`rename`](Storage::rename)
//!
//! # Concurrency
//!
//! `Storage` is a cheap `Arc` handle. Clones share one tree and one crawl:
//!
//! ```ignore
//! let storage = Storage::new(&config, "alice", "secret");
//! let (a, b) = tokio::join!(storage.tree(), storage.clone().tree());
//! assert_eq!(storage.stats().crawls_started, 1);
//! ```
//!
//! Mutations hold the tree's write lock across the physical effect, so within
//! one instance the tree always mirrors what was last written. Separate
//! instances for the same identity do not coordinate; concurrent writes to the
//! same physical path are last-writer-wins.

pub mod config;
pub mod export;
pub mod view;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::crypto::codec::MAX_SEGMENT_LEN;
use crate::crypto::{CryptoError, SegmentCodec, root_label};
use crate::error::{StorageError, StorageOpContext};
use crate::fs::kind::{NodeType, classify, extension_of};
use crate::tree::crawler::{CrawlCounters, Crawler, graft};
use crate::tree::node::{NodeArena, NodeId};
use crate::tree::resolver::{LogicalPath, MintedSegment, ResolvedPath, deep_path, lookup};

pub use config::StorageConfig;
pub use export::{NodeSnapshot, TreeExport};
pub use view::{DataEncoding, FileView};

/// Point-in-time copy of the crawl counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlStats {
    /// Root crawls started (at most one per instance).
    pub crawls_started: u64,
    /// Physical directories listed while crawling.
    pub directories_listed: u64,
    /// Entries omitted because they could not be decrypted or stat'ed.
    pub entries_skipped: u64,
}

type PendingCrawl = Shared<BoxFuture<'static, ()>>;

enum CrawlState {
    NotStarted,
    InProgress(PendingCrawl),
    Done,
}

struct StorageInner {
    base_dir: PathBuf,
    root_label: String,
    codec: SegmentCodec,
    tree: RwLock<NodeArena>,
    crawl: Mutex<CrawlState>,
    counters: CrawlCounters,
}

/// One principal's encrypted tree.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("base_dir", &self.inner.base_dir)
            .field("root_label", &self.inner.root_label)
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Open the tree of `identity`, decrypting with a key derived from `key`.
    ///
    /// No I/O happens here; the tree is crawled on first use.
    #[instrument(level = "info", skip(config, identity, key), fields(base_dir = %config.base_dir.display()))]
    pub fn new(config: &StorageConfig, identity: &str, key: &str) -> Self {
        let label = root_label(identity, &config.hash_salt);
        debug!(root_label = %label, "Opening storage");

        Self {
            inner: Arc::new(StorageInner {
                base_dir: config.base_dir.clone(),
                tree: RwLock::new(NodeArena::new(label.clone())),
                root_label: label,
                codec: SegmentCodec::from_secret(key, &config.hash_salt),
                crawl: Mutex::new(CrawlState::NotStarted),
                counters: CrawlCounters::default(),
            }),
        }
    }

    /// Physical name of this principal's root directory.
    pub fn root_label(&self) -> &str {
        &self.inner.root_label
    }

    /// Physical location of this principal's root directory.
    pub fn root_dir(&self) -> PathBuf {
        self.inner.root_dir()
    }

    pub fn stats(&self) -> CrawlStats {
        let counters = &self.inner.counters;
        CrawlStats {
            crawls_started: counters.crawls_started.load(Ordering::Relaxed),
            directories_listed: counters.directories_listed.load(Ordering::Relaxed),
            entries_skipped: counters.entries_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn is_crawled(&self) -> bool {
        matches!(*self.inner.lock_crawl(), CrawlState::Done)
    }

    /// Crawl the physical tree unless it has been (or is being) crawled.
    ///
    /// The first caller starts a single crawl in a background task; every other
    /// caller, concurrent or later, awaits that same crawl. Dropping the
    /// returned future does not cancel the crawl.
    pub async fn ensure_crawled(&self) {
        let pending = {
            let mut state = self.inner.lock_crawl();
            match &*state {
                CrawlState::Done => return,
                CrawlState::InProgress(pending) => pending.clone(),
                CrawlState::NotStarted => {
                    let pending = self.inner.start_crawl();
                    *state = CrawlState::InProgress(pending.clone());
                    pending
                }
            }
        };
        pending.await;
    }

    /// Snapshot of the decrypted tree.
    #[instrument(level = "debug", skip_all)]
    pub async fn tree(&self) -> NodeSnapshot {
        self.ensure_crawled().await;
        let tree = self.inner.tree.read().await;
        NodeSnapshot::from_arena(&tree, tree.root())
    }

    /// Tree snapshot together with the node type table.
    pub async fn export(&self) -> TreeExport {
        TreeExport::new(self.tree().await)
    }

    /// Kind of the node at `path`, if it exists.
    pub async fn exists(&self, path: impl AsRef<str>) -> Option<NodeType> {
        self.ensure_crawled().await;
        let path = LogicalPath::parse(path);
        let tree = self.inner.tree.read().await;
        lookup(&tree, &path).map(|id| tree[id].kind)
    }

    /// Read and decrypt the file at `path`.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound`: no node matches `path` exactly
    /// - `StorageError::NotAFile`: `path` is a directory
    /// - `StorageError::Decrypt`: the body cannot be decrypted with this key
    /// - `StorageError::Io`: the physical read failed
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref()))]
    pub async fn read_file(&self, path: impl AsRef<str>) -> Result<Vec<u8>, StorageError> {
        self.ensure_crawled().await;
        let path = LogicalPath::parse(path);
        let tree = self.inner.tree.read().await;

        let resolved = self.inner.resolve(&tree, &path);
        let node = resolved.require_exact(&path)?;
        if tree[node].kind.is_crawlable() {
            return Err(StorageError::NotAFile { path: path.as_str().to_string() });
        }

        let context = || {
            StorageOpContext::new()
                .with_logical_path(path.as_str())
                .with_physical_path(&resolved.physical_file)
        };
        let raw = fs::read(&resolved.physical_file)
            .await
            .map_err(|e| StorageError::io(e, context()))?;
        let encoded = String::from_utf8(raw).map_err(|_| StorageError::Decrypt {
            source: CryptoError::MalformedCiphertext {
                reason: "file body is not text".to_string(),
            },
            context: context(),
        })?;
        let content = self
            .inner
            .codec
            .decrypt_bytes(&encoded)
            .map_err(|source| StorageError::Decrypt { source, context: context() })?;

        debug!(content_size = content.len(), "File decrypted");
        Ok(content)
    }

    /// Read `path` and wrap it for display (text or base64 by kind).
    pub async fn read_view(&self, path: impl AsRef<str>) -> Result<FileView, StorageError> {
        let logical = LogicalPath::parse(path.as_ref());
        let content = self.read_file(path).await?;
        Ok(FileView::new(&logical, &content))
    }

    /// Encrypt `data` into the file at `path`, creating parent directories.
    ///
    /// An existing file is overwritten.
    ///
    /// # Errors
    ///
    /// - `StorageError::Collision`: `path` is an existing directory
    /// - `StorageError::NotADirectory`: an ancestor of `path` is a file
    /// - `StorageError::InvalidPath`: `path` is the root
    /// - `StorageError::Io`: creating directories or writing failed
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref(), content_size = data.len()))]
    pub async fn write_file(&self, path: impl AsRef<str>, data: &[u8]) -> Result<(), StorageError> {
        self.write_file_inner(&LogicalPath::parse(path), data, true).await
    }

    /// Like [`write_file`](Self::write_file), but fails with `Collision` if
    /// `path` already exists.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref(), content_size = data.len()))]
    pub async fn write_new(&self, path: impl AsRef<str>, data: &[u8]) -> Result<(), StorageError> {
        self.write_file_inner(&LogicalPath::parse(path), data, false).await
    }

    async fn write_file_inner(
        &self,
        path: &LogicalPath,
        data: &[u8],
        overwrite: bool,
    ) -> Result<(), StorageError> {
        self.ensure_crawled().await;
        if path.is_root() {
            return Err(StorageError::InvalidPath {
                path: String::new(),
                reason: "cannot write to the root".to_string(),
            });
        }

        let mut tree = self.inner.tree.write().await;
        let resolved = self.inner.resolve(&tree, path);
        let context = || {
            StorageOpContext::new()
                .with_logical_path(path.as_str())
                .with_physical_path(&resolved.physical_file)
        };

        if resolved.exact {
            if tree[resolved.node].kind.is_crawlable() || !overwrite {
                return Err(StorageError::Collision {
                    path: path.as_str().to_string(),
                    context: context(),
                });
            }
        } else {
            check_ancestor(&tree, &resolved)?;
            check_segment_lengths(path, &resolved)?;
        }

        let (dirs, leaf) = match resolved.minted.split_last() {
            Some((leaf, dirs)) => (dirs, Some(leaf)),
            None => (&[][..], None),
        };
        let parent = if resolved.exact {
            resolved.node
        } else {
            self.inner
                .mint_dirs(&mut tree, resolved.node, dirs)
                .await
                .map_err(|e| StorageError::io(e, context()))?
        };

        let encoded = self.inner.codec.encrypt_bytes(data);
        fs::write(&resolved.physical_file, encoded)
            .await
            .map_err(|e| StorageError::io(e, context()))?;

        if let Some(leaf) = leaf {
            let kind = classify(&extension_of(&leaf.name));
            tree.insert_child(parent, kind, leaf.physical.clone(), &leaf.name);
        }

        info!(overwritten = resolved.exact, "File written");
        Ok(())
    }

    /// Create the directory at `path` and any missing parents.
    ///
    /// Creating an existing directory succeeds.
    ///
    /// # Errors
    ///
    /// - `StorageError::Collision`: `path` is an existing file
    /// - `StorageError::NotADirectory`: an ancestor of `path` is a file
    /// - `StorageError::Io`: directory creation failed
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref()))]
    pub async fn create_dir(&self, path: impl AsRef<str>) -> Result<(), StorageError> {
        self.ensure_crawled().await;
        let path = LogicalPath::parse(path);

        let mut tree = self.inner.tree.write().await;
        let resolved = self.inner.resolve(&tree, &path);
        let context = || {
            StorageOpContext::new()
                .with_logical_path(path.as_str())
                .with_physical_path(&resolved.physical_file)
        };

        if resolved.exact {
            if !tree[resolved.node].kind.is_crawlable() {
                return Err(StorageError::Collision {
                    path: path.as_str().to_string(),
                    context: context(),
                });
            }
        } else {
            check_ancestor(&tree, &resolved)?;
            check_segment_lengths(&path, &resolved)?;
        }

        self.inner
            .mint_dirs(&mut tree, resolved.node, &resolved.minted)
            .await
            .map_err(|e| StorageError::io(e, context()))?;

        info!(created = resolved.minted.len(), "Directory created");
        Ok(())
    }

    /// Write a file or create a directory depending on `kind`.
    ///
    /// Any `FILE` bit writes `data` as a file; `DIR` creates a directory;
    /// anything else is rejected.
    pub async fn write(
        &self,
        path: impl AsRef<str>,
        kind: NodeType,
        data: &[u8],
    ) -> Result<(), StorageError> {
        if kind.is_file() {
            self.write_file(path, data).await
        } else if kind.contains(NodeType::DIR) {
            self.create_dir(path).await
        } else {
            Err(StorageError::InvalidPath {
                path: path.as_ref().to_string(),
                reason: format!("invalid type {:#x}", kind.bits()),
            })
        }
    }

    /// Write each `(name, data)` pair into `dir`, stopping at the first failure.
    #[instrument(level = "info", skip_all, fields(dir = %dir.as_ref()))]
    pub async fn upload<I, N, D>(&self, dir: impl AsRef<str>, files: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: AsRef<[u8]>,
    {
        let dir = LogicalPath::parse(dir);
        let mut written = 0;
        for (name, data) in files {
            let name = name.as_ref();
            if name.is_empty() || name.contains('/') {
                return Err(StorageError::InvalidPath {
                    path: name.to_string(),
                    reason: "upload names must be single segments".to_string(),
                });
            }
            self.write_file(dir.join(name).as_str(), data.as_ref()).await?;
            written += 1;
        }
        info!(written, "Upload finished");
        Ok(written)
    }

    /// Remove the file or directory (recursively) at `path`.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound`: no node matches `path` exactly
    /// - `StorageError::InvalidPath`: `path` is the root
    /// - `StorageError::Io`: the physical removal failed
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref()))]
    pub async fn delete(&self, path: impl AsRef<str>) -> Result<(), StorageError> {
        self.ensure_crawled().await;
        let path = LogicalPath::parse(path);
        if path.is_root() {
            return Err(StorageError::InvalidPath {
                path: String::new(),
                reason: "cannot delete the root".to_string(),
            });
        }

        let mut tree = self.inner.tree.write().await;
        let resolved = self.inner.resolve(&tree, &path);
        let node = resolved.require_exact(&path)?;
        let is_dir = tree[node].kind.is_crawlable();

        let result = if is_dir {
            fs::remove_dir_all(&resolved.physical_file).await
        } else {
            fs::remove_file(&resolved.physical_file).await
        };

        match result {
            Ok(()) => {
                tree.detach(node);
                info!(is_dir, "Deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Node vanished from disk, dropping it from the tree");
                tree.detach(node);
                Err(StorageError::not_found(path.as_str()))
            }
            Err(e) => Err(StorageError::io(
                e,
                StorageOpContext::new()
                    .with_logical_path(path.as_str())
                    .with_physical_path(&resolved.physical_file),
            )),
        }
    }

    /// Rename the node at `path` to `new_name` within its parent directory.
    ///
    /// `new_name` is normalized together with the parent path, so it may move
    /// the node elsewhere inside the tree but never above the root. The whole
    /// subtree moves with a single physical rename.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound`: no node matches `path` exactly
    /// - `StorageError::Collision`: the target already exists
    /// - `StorageError::InvalidPath`: `path` or the target is the root, or the
    ///   target lies inside the source
    /// - `StorageError::NotADirectory`: an ancestor of the target is a file
    /// - `StorageError::Io`: the physical rename failed
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref(), new_name = %new_name))]
    pub async fn rename(&self, path: impl AsRef<str>, new_name: &str) -> Result<(), StorageError> {
        self.ensure_crawled().await;
        let source = LogicalPath::parse(path);
        let target = source.parent().unwrap_or_else(LogicalPath::root).join(new_name);

        if source.is_root() || target.is_root() {
            return Err(StorageError::InvalidPath {
                path: target.as_str().to_string(),
                reason: "cannot rename the root or onto it".to_string(),
            });
        }

        let mut tree = self.inner.tree.write().await;
        let from = self.inner.resolve(&tree, &source);
        let node = from.require_exact(&source)?;
        if source == target {
            return Ok(());
        }

        let to = self.inner.resolve(&tree, &target);
        let context = || {
            StorageOpContext::new()
                .with_logical_path(target.as_str())
                .with_physical_path(&to.physical_file)
        };
        if to.exact {
            return Err(StorageError::Collision {
                path: target.as_str().to_string(),
                context: context(),
            });
        }
        if tree.is_within(to.node, node) {
            return Err(StorageError::InvalidPath {
                path: target.as_str().to_string(),
                reason: format!("'{}' cannot be moved inside itself", source.as_str()),
            });
        }
        check_ancestor(&tree, &to)?;
        check_segment_lengths(&target, &to)?;

        let Some((leaf, intermediate)) = to.minted.split_last() else {
            // Not exact, so at least the leaf was minted
            return Ok(());
        };
        let parent = self
            .inner
            .mint_dirs(&mut tree, to.node, intermediate)
            .await
            .map_err(|e| StorageError::io(e, context()))?;
        fs::rename(&from.physical_file, &to.physical_file)
            .await
            .map_err(|e| StorageError::io(e, context()))?;

        tree.relocate(node, parent, leaf.physical.clone(), &leaf.name);
        if tree[node].kind.is_file() {
            tree.set_kind(node, classify(&extension_of(&leaf.name)));
        }

        info!(renamed_to = %target, "Renamed");
        Ok(())
    }
}

impl StorageInner {
    fn root_dir(&self) -> PathBuf {
        self.base_dir.join(&self.root_label)
    }

    fn lock_crawl(&self) -> std::sync::MutexGuard<'_, CrawlState> {
        self.crawl.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, tree: &NodeArena, path: &LogicalPath) -> ResolvedPath {
        deep_path(tree, &self.codec, &self.base_dir, path)
    }

    /// Create one directory per minted segment below `parent`, inserting each
    /// node as soon as it exists on disk. Returns the deepest node.
    async fn mint_dirs(
        &self,
        tree: &mut NodeArena,
        parent: NodeId,
        minted: &[MintedSegment],
    ) -> std::io::Result<NodeId> {
        let mut dir = tree.physical_path(parent, &self.base_dir);
        fs::create_dir_all(&dir).await?;

        let mut current = parent;
        for segment in minted {
            dir.push(&segment.physical);
            fs::create_dir(&dir).await?;
            current = tree.insert_child(current, NodeType::DIR, segment.physical.clone(), &segment.name);
        }
        Ok(current)
    }

    /// Spawn the one crawl of this instance and return a shareable handle to it.
    fn start_crawl(self: &Arc<Self>) -> PendingCrawl {
        let crawling = Arc::clone(self);
        let task = tokio::spawn(async move { crawling.crawl_root().await });

        let finishing = Arc::clone(self);
        async move {
            if let Err(e) = task.await {
                warn!(error = %e, "Crawl task did not complete");
            }
            *finishing.lock_crawl() = CrawlState::Done;
        }
        .boxed()
        .shared()
    }

    async fn crawl_root(&self) {
        self.counters.crawls_started.fetch_add(1, Ordering::Relaxed);
        let root_dir = self.root_dir();
        debug!(path = %root_dir.display(), "Starting crawl");

        if let Err(e) = fs::create_dir_all(&root_dir).await {
            warn!(path = %root_dir.display(), error = %e, "Failed to create root directory");
        }

        let entries = Crawler::new(&self.codec, &self.counters)
            .crawl(NodeType::ROOT, root_dir)
            .await;

        let mut tree = self.tree.write().await;
        let root = tree.root();
        let added = graft(&mut tree, root, entries);
        debug!(node_count = added, "Crawl finished");
    }
}

/// Fail with `NotADirectory` when the deepest existing ancestor is a file.
fn check_ancestor(tree: &NodeArena, resolved: &ResolvedPath) -> Result<(), StorageError> {
    let ancestor = &tree[resolved.node];
    if ancestor.kind.is_crawlable() {
        Ok(())
    } else {
        Err(StorageError::NotADirectory {
            path: display_path(&ancestor.logical_path).to_string(),
        })
    }
}

/// Fail with `InvalidPath` when a new segment is too long for a physical name.
fn check_segment_lengths(path: &LogicalPath, resolved: &ResolvedPath) -> Result<(), StorageError> {
    match resolved.minted.iter().find(|s| s.name.len() > MAX_SEGMENT_LEN) {
        Some(segment) => Err(StorageError::InvalidPath {
            path: path.as_str().to_string(),
            reason: format!(
                "name is {} bytes, longer than the {MAX_SEGMENT_LEN} byte limit",
                segment.name.len()
            ),
        }),
        None => Ok(()),
    }
}

/// Tree path without the `root` label, as callers spell it.
fn display_path(logical: &str) -> &str {
    logical
        .strip_prefix(crate::tree::node::ROOT_LOGICAL)
        .map_or(logical, |rest| rest.trim_start_matches('/'))
}
