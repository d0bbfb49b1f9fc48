pub mod cat;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod tree;
pub mod types;
pub mod write;

use veilfs_core::tree::LogicalPath;

/// Render a user-supplied path the way the tree spells it (`/` for the root).
pub fn display_path(path: &str) -> String {
    let logical = LogicalPath::parse(path);
    if logical.is_root() {
        "/".to_string()
    } else {
        format!("/{}", logical.as_str())
    }
}
