//! Presentation of decrypted file contents.

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;

use crate::fs::kind::{NodeType, classify, extension_of};
use crate::tree::resolver::LogicalPath;

/// How [`FileView::data`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataEncoding {
    Utf8,
    Base64,
}

/// A decrypted file ready for display or transport.
///
/// Images and videos are carried as base64; everything else as (lossy) UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub path: String,
    pub file: String,
    pub extension: String,
    pub kind: NodeType,
    pub encoding: DataEncoding,
    pub data: String,
    /// Number of `\n`-separated lines in `data`.
    pub lines: usize,
    /// Byte length of `data`.
    pub size: usize,
}

impl FileView {
    pub fn new(path: &LogicalPath, content: &[u8]) -> Self {
        let file = path.file_name().unwrap_or_default().to_string();
        let extension = extension_of(&file);
        let kind = classify(&extension);

        let (encoding, data) = if kind.is_media() {
            (DataEncoding::Base64, general_purpose::STANDARD.encode(content))
        } else {
            (DataEncoding::Utf8, String::from_utf8_lossy(content).into_owned())
        };

        FileView {
            path: path.as_str().to_string(),
            file,
            extension,
            kind,
            encoding,
            lines: data.split('\n').count(),
            size: data.len(),
            data,
        }
    }

    /// Decode `data` back into the original bytes.
    ///
    /// Lossy UTF-8 conversion is not reversible for invalid sequences.
    ///
    /// # Errors
    ///
    /// Returns the decode error when a base64 view's `data` is not valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            DataEncoding::Utf8 => Ok(self.data.as_bytes().to_vec()),
            DataEncoding::Base64 => general_purpose::STANDARD.decode(&self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_view() {
        let view = FileView::new(&LogicalPath::parse("notes/todo.md"), b"one\ntwo\nthree");
        assert_eq!(view.file, "todo.md");
        assert_eq!(view.extension, "md");
        assert_eq!(view.kind, NodeType::RAW);
        assert_eq!(view.encoding, DataEncoding::Utf8);
        assert_eq!(view.data, "one\ntwo\nthree");
        assert_eq!(view.lines, 3);
        assert_eq!(view.size, 13);
    }

    #[test]
    fn test_media_view_is_base64() {
        let content = [0x89, b'P', b'N', b'G', 0x00, 0xff];
        let view = FileView::new(&LogicalPath::parse("pics/cat.png"), &content);
        assert_eq!(view.kind, NodeType::PNG);
        assert_eq!(view.encoding, DataEncoding::Base64);
        assert_eq!(view.bytes().unwrap(), content);
    }

    #[test]
    fn test_corrupted_base64_is_an_error() {
        let mut view = FileView::new(&LogicalPath::parse("pics/cat.png"), b"image");
        view.data = "not base64!".to_string();
        assert!(view.bytes().is_err());
    }

    #[test]
    fn test_unknown_binary_is_lossy_text() {
        let view = FileView::new(&LogicalPath::parse("blob"), &[0xff, b'a']);
        assert_eq!(view.kind, NodeType::UNKNOWN);
        assert_eq!(view.encoding, DataEncoding::Utf8);
        assert!(view.data.ends_with('a'));
    }
}
