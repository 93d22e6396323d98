//! Photo payload handling: base64 data URLs in, decoded bytes out.

use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use regex::Regex;
use thiserror::Error;

/// `data:<type>/<subtype>[;param...];base64` header before the first comma.
static DATA_URL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime>[\w.+-]+/[\w.+-]+)(?:;[^;,]*)*;base64$")
        .expect("valid data url regex")
});

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("'{name}' is empty")]
    EmptyFile { name: String },

    #[error("'{name}' is not an image (detected {mime})")]
    UnsupportedType { name: String, mime: String },

    #[error("malformed data url: {0}")]
    Malformed(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Bytes,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let (header, payload) = raw
            .split_once(',')
            .ok_or_else(|| MediaError::Malformed("missing ',' separator".to_string()))?;
        if payload.contains(',') {
            return Err(MediaError::Malformed("unexpected ',' in payload".to_string()));
        }
        let captures = DATA_URL_HEADER
            .captures(header)
            .ok_or_else(|| MediaError::Malformed(format!("unsupported header '{header}'")))?;
        let mime = captures["mime"].to_ascii_lowercase();
        let bytes = STANDARD.decode(payload.trim())?;
        Ok(Self {
            mime,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }
}

/// Cheap shape check applied to uploads before they are stored.
pub fn looks_like_data_url(raw: &str) -> bool {
    raw.starts_with("data:") && raw.contains(";base64,")
}

/// An image picked for upload, not yet encoded.
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub name: String,
    /// Explicit type; guessed from the file name when absent.
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl PhotoFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, MediaError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| MediaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn mime_type(&self) -> String {
        self.mime.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }

    /// Encode as a data URL. Only non-empty images are accepted.
    pub fn encode(&self) -> Result<String, MediaError> {
        if self.bytes.is_empty() {
            return Err(MediaError::EmptyFile {
                name: self.name.clone(),
            });
        }
        let mime = self.mime_type();
        if !mime.starts_with("image/") {
            return Err(MediaError::UnsupportedType {
                name: self.name.clone(),
                mime,
            });
        }
        Ok(DataUrl::encode(&mime, &self.bytes))
    }
}
