use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::PageError;

/// Discriminator supplied with every source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }

    /// Guess from leading bytes: anything starting with `%PDF` is a PDF.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }

    /// Guess from a file extension, `None` if there is none.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(if ext == "pdf" { DocumentKind::Pdf } else { DocumentKind::Image })
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = PageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "image" => Ok(DocumentKind::Image),
            "pdf" => Ok(DocumentKind::Pdf),
            other => Err(PageError::UnknownKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Url(String),
}

impl From<PathBuf> for DocumentSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for DocumentSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Descriptor of the document being marked up.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub kind: DocumentKind,
    pub source: DocumentSource,
}

impl SourceDocument {
    pub fn new(kind: DocumentKind, source: impl Into<DocumentSource>) -> Self {
        Self { kind, source: source.into() }
    }

    pub fn pdf(source: impl Into<DocumentSource>) -> Self {
        Self::new(DocumentKind::Pdf, source)
    }

    pub fn image(source: impl Into<DocumentSource>) -> Self {
        Self::new(DocumentKind::Image, source)
    }

    /// Local file, kind taken from the extension or sniffed from the content.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let path = path.as_ref();
        let kind = match DocumentKind::from_extension(path) {
            Some(kind) => kind,
            None => DocumentKind::sniff(&std::fs::read(path)?),
        };
        Ok(Self::new(kind, path))
    }

    pub fn from_url(kind: DocumentKind, url: impl Into<String>) -> Self {
        Self { kind, source: DocumentSource::Url(url.into()) }
    }

    /// Short description for logs and notices.
    pub fn describe(&self) -> String {
        match &self.source {
            DocumentSource::Path(path) => path.display().to_string(),
            DocumentSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            DocumentSource::Url(url) => url.clone(),
        }
    }

    /// Read or fetch the full byte stream.
    pub fn read_bytes(&self, timeout: Duration) -> Result<Vec<u8>, PageError> {
        match &self.source {
            DocumentSource::Path(path) => Ok(std::fs::read(path)?),
            DocumentSource::Bytes(bytes) => Ok(bytes.clone()),
            DocumentSource::Url(url) => fetch(url, timeout),
        }
    }
}

fn fetch(url: &str, timeout: Duration) -> Result<Vec<u8>, PageError> {
    let fetch_error = |message: String| PageError::Fetch { url: url.to_owned(), message };

    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let resp = agent
        .get(url)
        .set("User-Agent", "markup")
        .call()
        .map_err(|e| fetch_error(e.to_string()))?;

    let mut bytes = Vec::new();
    resp.into_reader().read_to_end(&mut bytes).map_err(|e| fetch_error(e.to_string()))?;
    tracing::debug!(url, bytes = bytes.len(), "fetched document");
    Ok(bytes)
}
