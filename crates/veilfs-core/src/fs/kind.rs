//! Node capability bits and extension-based classification.
//!
//! Each node carries a [`NodeType`] bitmask. Structural bits (`ROOT`, `DIR`)
//! and content bits (`RAW`, `PNG`, ...) are disjoint; the named unions
//! (`CRAWLABLE`, `IMAGE`, `VIDEO`, `FILE`) are exposed as predicates so callers
//! never compare against raw numbers.

use bitflags::bitflags;
use serde::{Serialize, Serializer};

bitflags! {
    /// Capability bits of a tree node.
    ///
    /// Classification assigns exactly one bit per non-root node: `DIR` for
    /// directories, or a single content bit for files.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeType: u16 {
        const ROOT    = 0b0000_0000_0001;
        const DIR     = 0b0000_0000_0010;
        const BINARY  = 0b0000_0000_0100;
        const RAW     = 0b0000_0000_1000;
        const PNG     = 0b0000_0001_0000;
        const JPG     = 0b0000_0010_0000;
        const GIF     = 0b0000_0100_0000;
        const MP4     = 0b0000_1000_0000;
        const WMV     = 0b0001_0000_0000;
        const UNKNOWN = 0b0010_0000_0000;

        /// Nodes whose physical counterpart is a directory.
        const CRAWLABLE = Self::ROOT.bits() | Self::DIR.bits();
        const IMAGE     = Self::PNG.bits() | Self::JPG.bits() | Self::GIF.bits();
        const VIDEO     = Self::MP4.bits() | Self::WMV.bits();
        const FILE      = Self::BINARY.bits()
            | Self::RAW.bits()
            | Self::IMAGE.bits()
            | Self::VIDEO.bits()
            | Self::UNKNOWN.bits();
    }
}

impl NodeType {
    #[inline]
    pub fn is_crawlable(self) -> bool {
        self.intersects(Self::CRAWLABLE)
    }

    #[inline]
    pub fn is_file(self) -> bool {
        self.intersects(Self::FILE)
    }

    #[inline]
    pub fn is_image(self) -> bool {
        self.intersects(Self::IMAGE)
    }

    #[inline]
    pub fn is_video(self) -> bool {
        self.intersects(Self::VIDEO)
    }

    /// Images and videos are binary media; everything else is shown as text.
    #[inline]
    pub fn is_media(self) -> bool {
        self.is_image() || self.is_video()
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

/// Known extensions per content bit. Extend the table, not the lookup.
const EXTENSION_TABLE: &[(NodeType, &[&str])] = &[
    (
        NodeType::RAW,
        &[
            "txt", "md", "markdown", "json", "js", "jsx", "ts", "tsx", "rs", "py", "rb", "go",
            "c", "h", "cpp", "hpp", "cs", "java", "kt", "swift", "php", "sh", "bash", "zsh",
            "html", "htm", "css", "scss", "xml", "yml", "yaml", "toml", "ini", "cfg", "conf",
            "csv", "tsv", "log", "sql", "vue", "lua",
        ],
    ),
    (NodeType::PNG, &["png"]),
    (NodeType::JPG, &["jpg", "jpeg"]),
    (NodeType::GIF, &["gif"]),
    (NodeType::MP4, &["mp4", "m4v"]),
    (NodeType::WMV, &["wmv"]),
    (
        NodeType::BINARY,
        &[
            "bin", "exe", "dll", "so", "dylib", "o", "a", "class", "jar", "zip", "gz", "tgz",
            "tar", "xz", "bz2", "7z", "rar", "iso", "img", "dmg", "pdf", "wasm",
        ],
    ),
];

/// Returns the lowercase substring after the last `.`, or `""` if there is none.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Maps an extension to its content bit, falling back to [`NodeType::UNKNOWN`].
pub fn classify(extension: &str) -> NodeType {
    EXTENSION_TABLE
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension))
        .map_or(NodeType::UNKNOWN, |(kind, _)| *kind)
}

/// Every named bit and union, for callers interpreting exported node kinds.
pub fn type_table() -> Vec<(&'static str, u16)> {
    NodeType::all()
        .iter_names()
        .map(|(name, _)| name)
        .chain(["CRAWLABLE", "IMAGE", "VIDEO", "FILE"])
        .filter_map(|name| NodeType::from_name(name).map(|kind| (name, kind.bits())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("readme.md"), "md");
        assert_eq!(extension_of("Photo.JPEG"), "jpeg");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".gitignore"), "gitignore");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(classify("md"), NodeType::RAW);
        assert_eq!(classify("png"), NodeType::PNG);
        assert_eq!(classify("jpg"), NodeType::JPG);
        assert_eq!(classify("jpeg"), NodeType::JPG);
        assert_eq!(classify("gif"), NodeType::GIF);
        assert_eq!(classify("mp4"), NodeType::MP4);
        assert_eq!(classify("wmv"), NodeType::WMV);
        assert_eq!(classify("exe"), NodeType::BINARY);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(""), NodeType::UNKNOWN);
        assert_eq!(classify("qqq"), NodeType::UNKNOWN);
        // Lookup is exact; callers lowercase via extension_of
        assert_eq!(classify("PNG"), NodeType::UNKNOWN);
    }

    #[test]
    fn test_classification_yields_single_content_bit() {
        for (_, extensions) in EXTENSION_TABLE {
            for ext in *extensions {
                let kind = classify(ext);
                assert_eq!(kind.bits().count_ones(), 1, "extension {ext} got {kind:?}");
                assert!(kind.is_file());
                assert!(!kind.is_crawlable());
            }
        }
    }

    #[test]
    fn test_extension_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for (_, extensions) in EXTENSION_TABLE {
            for ext in *extensions {
                assert!(seen.insert(*ext), "extension {ext} listed twice");
            }
        }
    }

    #[test]
    fn test_unions() {
        assert!(NodeType::ROOT.is_crawlable());
        assert!(NodeType::DIR.is_crawlable());
        assert!(!NodeType::DIR.is_file());
        assert!(NodeType::GIF.is_image());
        assert!(NodeType::WMV.is_video());
        assert!(NodeType::UNKNOWN.is_file());
        assert!(!NodeType::RAW.is_media());
        assert!(!NodeType::FILE.intersects(NodeType::CRAWLABLE));
    }

    #[test]
    fn test_type_table_contains_unions() {
        let table = type_table();
        let lookup = |name: &str| table.iter().find(|(n, _)| *n == name).map(|(_, b)| *b);

        assert_eq!(lookup("ROOT"), Some(NodeType::ROOT.bits()));
        assert_eq!(lookup("CRAWLABLE"), Some(NodeType::CRAWLABLE.bits()));
        assert_eq!(lookup("FILE"), Some(NodeType::FILE.bits()));
        assert_eq!(lookup("IMAGE"), Some(NodeType::IMAGE.bits()));
        assert_eq!(lookup("VIDEO"), Some(NodeType::VIDEO.bits()));
    }
}
