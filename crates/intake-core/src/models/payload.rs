//! Inbound upload model.
//!
//! Callers describe what arrived on the wire with an [`UploadRequest`]: an
//! attached multipart file, a raw body with a filename hint, or neither. The
//! coordinator turns it into a single [`UploadPayload`] so the rest of the
//! pipeline never has to care which transport carried the bytes.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::AsyncRead;

/// Owned, type-erased byte source.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// How the payload bytes can be reached.
pub enum PayloadBody {
    /// The bytes already sit in a temporary file on local disk.
    Backed(PathBuf),
    /// The bytes must be read from a stream. `fallback` is read once if the
    /// primary reader fails.
    Stream {
        reader: BoxedReader,
        fallback: Option<BoxedReader>,
    },
}

impl std::fmt::Debug for PayloadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadBody::Backed(path) => f.debug_tuple("Backed").field(path).finish(),
            PayloadBody::Stream { fallback, .. } => f
                .debug_struct("Stream")
                .field("has_fallback", &fallback.is_some())
                .finish(),
        }
    }
}

/// A file received as a named multipart field.
#[derive(Debug)]
pub struct AttachedFile {
    filename: String,
    size_hint: Option<u64>,
    body: PayloadBody,
}

impl AttachedFile {
    /// Attached file already spooled to a temporary file.
    pub fn backed(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            size_hint: None,
            body: PayloadBody::Backed(path.into()),
        }
    }

    /// Attached file only reachable as a stream.
    pub fn from_reader(filename: impl Into<String>, reader: BoxedReader) -> Self {
        Self {
            filename: filename.into(),
            size_hint: None,
            body: PayloadBody::Stream {
                reader,
                fallback: None,
            },
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    /// Reader tried once if the primary stream fails (the raw request body).
    pub fn with_fallback(mut self, fallback: BoxedReader) -> Self {
        if let PayloadBody::Stream {
            fallback: ref mut slot,
            ..
        } = self.body
        {
            *slot = Some(fallback);
        }
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// A raw request body with a filename hint, as sent by ad-hoc clients.
#[derive(Debug)]
pub struct RawBody {
    filename_hint: Option<String>,
    size_hint: Option<u64>,
    body: PayloadBody,
}

impl RawBody {
    pub fn new(filename_hint: impl Into<String>, reader: BoxedReader) -> Self {
        Self {
            filename_hint: Some(filename_hint.into()),
            size_hint: None,
            body: PayloadBody::Stream {
                reader,
                fallback: None,
            },
        }
    }

    /// A body that arrived without a filename hint. It never yields a payload.
    pub fn without_filename(reader: BoxedReader) -> Self {
        Self {
            filename_hint: None,
            size_hint: None,
            body: PayloadBody::Stream {
                reader,
                fallback: None,
            },
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    pub fn with_fallback(mut self, fallback: BoxedReader) -> Self {
        if let PayloadBody::Stream {
            fallback: ref mut slot,
            ..
        } = self.body
        {
            *slot = Some(fallback);
        }
        self
    }

    pub fn filename_hint(&self) -> Option<&str> {
        self.filename_hint.as_deref()
    }
}

/// Everything a caller extracted from the inbound HTTP request.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub attached: Option<AttachedFile>,
    pub raw_body: Option<RawBody>,
}

impl UploadRequest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn attached(file: AttachedFile) -> Self {
        Self {
            attached: Some(file),
            raw_body: None,
        }
    }

    pub fn raw(body: RawBody) -> Self {
        Self {
            attached: None,
            raw_body: Some(body),
        }
    }

    /// Collapse the request into the payload to ingest.
    ///
    /// An attached file wins over a raw body. A raw body without a non-empty
    /// filename hint does not count. Returns `None` when there is nothing to do.
    pub fn into_payload(self) -> Option<UploadPayload> {
        if let Some(file) = self.attached {
            return Some(UploadPayload {
                filename: file.filename,
                size_hint: file.size_hint,
                body: file.body,
            });
        }

        let raw = self.raw_body?;
        let filename = raw.filename_hint.filter(|name| !name.trim().is_empty())?;
        Some(UploadPayload {
            filename,
            size_hint: raw.size_hint,
            body: raw.body,
        })
    }
}

/// Transport-independent view of one inbound file.
#[derive(Debug)]
pub struct UploadPayload {
    filename: String,
    size_hint: Option<u64>,
    body: PayloadBody,
}

impl UploadPayload {
    pub fn new(filename: impl Into<String>, body: PayloadBody) -> Self {
        Self {
            filename: filename.into(),
            size_hint: None,
            body,
        }
    }

    /// Original, unsanitized filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Temporary file holding the bytes, if the transport already spooled them.
    pub fn backing_path(&self) -> Option<&Path> {
        match &self.body {
            PayloadBody::Backed(path) => Some(path.as_path()),
            PayloadBody::Stream { .. } => None,
        }
    }

    pub fn into_body(self) -> PayloadBody {
        self.body
    }
}
