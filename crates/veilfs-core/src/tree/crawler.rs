//! Physical tree crawl.
//!
//! The crawler lists a physical directory, decrypts and classifies every
//! entry concurrently, and recurses into subdirectories. It produces a
//! detached [`CrawledEntry`] forest which [`graft`] then attaches to the
//! arena in one step.
//!
//! Failures are fail-soft: an entry whose name cannot be decrypted, or whose
//! metadata cannot be read, is left out of the result and counted in
//! [`CrawlCounters::entries_skipped`]. A directory that cannot be listed
//! contributes no children.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::crypto::SegmentCodec;
use crate::fs::kind::{NodeType, classify, extension_of};
use crate::tree::node::{NodeArena, NodeId};

/// A decrypted entry discovered on disk, with its subtree.
#[derive(Debug, Clone)]
pub struct CrawledEntry {
    pub kind: NodeType,
    pub physical_segment: String,
    pub name: String,
    pub children: Vec<CrawledEntry>,
}

/// Counters shared by every crawl of one storage instance.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub crawls_started: AtomicU64,
    pub directories_listed: AtomicU64,
    pub entries_skipped: AtomicU64,
}

impl CrawlCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Walks a physical directory tree, decrypting names as it goes.
pub struct Crawler<'a> {
    codec: &'a SegmentCodec,
    counters: &'a CrawlCounters,
}

impl<'a> Crawler<'a> {
    pub fn new(codec: &'a SegmentCodec, counters: &'a CrawlCounters) -> Self {
        Self { codec, counters }
    }

    /// Materialize the subtree below `dir`.
    ///
    /// Returns immediately with no entries when `kind` is not crawlable. The
    /// returned future completes only after every descendant has been crawled.
    pub fn crawl(&self, kind: NodeType, dir: PathBuf) -> BoxFuture<'_, Vec<CrawledEntry>> {
        async move {
            if !kind.is_crawlable() {
                return Vec::new();
            }

            let mut listing = match fs::read_dir(&dir).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to list directory, omitting its entries");
                    return Vec::new();
                }
            };
            CrawlCounters::bump(&self.counters.directories_listed);

            let mut physical_names = Vec::new();
            loop {
                match listing.next_entry().await {
                    Ok(Some(entry)) => match entry.file_name().into_string() {
                        Ok(name) => physical_names.push(name),
                        Err(raw) => {
                            warn!(name = ?raw, "Skipping non UTF-8 physical name");
                            CrawlCounters::bump(&self.counters.entries_skipped);
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %dir.display(), error = %e, "Directory listing interrupted");
                        break;
                    }
                }
            }

            let entries = join_all(
                physical_names
                    .into_iter()
                    .map(|physical| self.crawl_entry(&dir, physical)),
            )
            .await;

            let entries: Vec<CrawledEntry> = entries.into_iter().flatten().collect();
            trace!(path = %dir.display(), entry_count = entries.len(), "Crawled directory");
            entries
        }
        .boxed()
    }

    async fn crawl_entry(&self, dir: &Path, physical: String) -> Option<CrawledEntry> {
        let name = match self.codec.decrypt_segment(&physical) {
            Ok(name) if is_valid_segment(&name) => name,
            Ok(name) => {
                warn!(encrypted_name = %physical, decrypted = %name, "Decrypted name is not a valid path segment");
                CrawlCounters::bump(&self.counters.entries_skipped);
                return None;
            }
            Err(e) => {
                warn!(encrypted_name = %physical, error = %e, "Failed to decrypt entry name");
                CrawlCounters::bump(&self.counters.entries_skipped);
                return None;
            }
        };

        let path = dir.join(&physical);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to stat entry");
                CrawlCounters::bump(&self.counters.entries_skipped);
                return None;
            }
        };

        let kind = if metadata.is_dir() {
            NodeType::DIR
        } else {
            classify(&extension_of(&name))
        };
        let children = self.crawl(kind, path).await;

        Some(CrawledEntry {
            kind,
            physical_segment: physical,
            name,
            children,
        })
    }
}

/// Segments may not be empty, `.`/`..`, or contain a separator.
pub(crate) fn is_valid_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

/// Attach a crawled forest below `parent`.
///
/// Every entry becomes its own node, even when a sibling decrypts to the same
/// name: each node's physical path must follow the directory it was found in.
pub fn graft(arena: &mut NodeArena, parent: NodeId, entries: Vec<CrawledEntry>) -> usize {
    let mut added = 0;
    for entry in entries {
        if arena.child_named(parent, &entry.name).is_some() {
            debug!(name = %entry.name, "Another physical entry decrypts to the same name");
        }
        let id = arena.insert_child(parent, entry.kind, entry.physical_segment, &entry.name);
        added += 1 + graft(arena, id, entry.children);
    }
    added
}
