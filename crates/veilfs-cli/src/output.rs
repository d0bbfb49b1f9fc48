use comfy_table::Table;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;

use veilfs_core::NodeType;

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Format a byte size into a human-readable string
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1}G", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1}M", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1}K", b as f64 / KB as f64),
        b => format!("{b}B"),
    }
}

/// Short label for a node kind, e.g. `dir` or `png`.
pub fn format_kind(kind: NodeType) -> String {
    if kind.contains(NodeType::ROOT) {
        return "root".to_string();
    }
    if kind.contains(NodeType::DIR) {
        return "dir".to_string();
    }
    kind.iter_names()
        .next()
        .map_or_else(|| format!("{:#x}", kind.bits()), |(name, _)| name.to_lowercase())
}

/// Format an entry type indicator
pub fn format_entry_type(is_dir: bool) -> &'static str {
    if is_dir { "d" } else { "-" }
}
