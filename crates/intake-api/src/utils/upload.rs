//! Decoding inbound HTTP uploads into an [`UploadRequest`].

use std::io;

use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{header, HeaderMap};
use futures::TryStreamExt;
use intake_core::{AppError, AttachedFile, RawBody, UploadRequest};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use crate::error::HttpAppError;

/// Multipart field names accepted as the attached file. The part must also
/// carry a filename; plain text fields under these names are ignored.
pub const FILE_FIELDS: [&str; 2] = ["file", "filename"];

/// An upload request whose attached file (if any) is spooled to a temporary
/// file. The temporary file lives as long as this value.
#[derive(Debug)]
pub struct DecodedUpload {
    pub request: UploadRequest,
    _spool: Option<NamedTempFile>,
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Spool the single file field of a multipart form to a temporary file.
///
/// A form with no file field yields an empty request. More than one file
/// field is rejected.
pub async fn spool_multipart_file(mut multipart: Multipart) -> Result<DecodedUpload, HttpAppError> {
    let mut spooled: Option<(String, NamedTempFile, u64)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }
        if spooled.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            )
            .into());
        }

        let spool = NamedTempFile::new()?;
        let mut writer = tokio::fs::File::from_std(spool.reopen()?);
        let mut size = 0u64;

        while let Some(chunk) = field.chunk().await? {
            writer.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        writer.flush().await?;

        tracing::debug!(
            filename = %filename,
            size_bytes = size,
            spool = %spool.path().display(),
            "Multipart file spooled"
        );
        spooled = Some((filename, spool, size));
    }

    Ok(match spooled {
        Some((filename, spool, size)) => DecodedUpload {
            request: UploadRequest::attached(
                AttachedFile::backed(filename, spool.path()).with_size_hint(size),
            ),
            _spool: Some(spool),
        },
        None => DecodedUpload {
            request: UploadRequest::empty(),
            _spool: None,
        },
    })
}

/// Wrap a raw request body as a streamed upload with a filename hint.
pub fn raw_body_upload(
    body: Body,
    filename_hint: Option<String>,
    size_hint: Option<u64>,
) -> DecodedUpload {
    let reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    let boxed = Box::pin(reader);

    let mut raw = match filename_hint {
        Some(name) => RawBody::new(name, boxed),
        None => RawBody::without_filename(boxed),
    };
    if let Some(size) = size_hint {
        raw = raw.with_size_hint(size);
    }

    DecodedUpload {
        request: UploadRequest::raw(raw),
        _spool: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn detects_multipart_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        assert!(is_multipart(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        assert!(!is_multipart(&headers));
        assert!(!is_multipart(&HeaderMap::new()));
    }

    #[test]
    fn parses_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), Some(42));
    }

    #[test]
    fn raw_body_without_hint_is_empty() {
        let decoded = raw_body_upload(Body::from("data"), None, None);
        assert!(decoded.request.into_payload().is_none());
    }

    #[test]
    fn raw_body_with_hint_has_payload() {
        let decoded = raw_body_upload(Body::from("data"), Some("a.txt".to_string()), Some(4));
        let payload = decoded.request.into_payload().unwrap();
        assert_eq!(payload.filename(), "a.txt");
        assert_eq!(payload.size_hint(), Some(4));
    }
}
