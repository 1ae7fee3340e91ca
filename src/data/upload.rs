use std::path::Path;

use crate::error::NormalizeError;

/// Raw contents of a file handed over by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk into an upload.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("Cannot read file: {e}"))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        tracing::info!("Read {} bytes from {:?}", bytes.len(), path);
        Ok(Self { filename, bytes })
    }

    /// Whether a dropped or picked path looks like something we can load.
    pub fn is_supported_path(path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        matches!(ext.as_str(), "csv" | "txt" | "tsv")
    }

    /// Decode the bytes as text.
    ///
    /// UTF-8 is tried first (a leading BOM is dropped), then Latin-1 where
    /// each byte maps to the same code point. Empty, whitespace-only and
    /// binary (NUL-containing) input is rejected.
    pub fn decode_text(&self) -> Result<String, NormalizeError> {
        if self.bytes.contains(&0) {
            return Err(NormalizeError::Parse("file contains binary data".to_string()));
        }

        let text = match String::from_utf8(self.bytes.clone()) {
            Ok(s) => s,
            Err(_) => self.bytes.iter().map(|&b| b as char).collect(),
        };
        let text = match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        };

        if text.trim().is_empty() {
            return Err(NormalizeError::Parse("file is empty".to_string()));
        }
        Ok(text)
    }
}
