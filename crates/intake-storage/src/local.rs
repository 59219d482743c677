use std::path::{Path, PathBuf};

use intake_core::{BoxedReader, PayloadBody, UploadPayload, UploadToken};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::keys;
use crate::traits::{StorageError, StorageResult};

/// A file durably written to `<uploads_root>/<token>/<basename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    token: UploadToken,
    basename: String,
    path: PathBuf,
    size: u64,
}

impl StagedFile {
    pub fn token(&self) -> &UploadToken {
        &self.token
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Absolute path on local disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// `/uploads/<token>/<basename>` fragment handed back to callers.
    pub fn locator(&self) -> String {
        keys::local_locator(&self.token, &self.basename)
    }
}

/// Writes inbound payloads into token-scoped directories under the uploads root.
#[derive(Debug, Clone)]
pub struct LocalStager {
    uploads_root: PathBuf,
}

impl LocalStager {
    /// Create a stager rooted at `uploads_root`.
    ///
    /// A relative root is resolved against the process working directory.
    pub fn new(uploads_root: impl Into<PathBuf>) -> Self {
        let root = uploads_root.into();
        let uploads_root = if root.is_absolute() {
            root
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(root),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        root = %root.display(),
                        "Could not resolve working directory, keeping relative uploads root"
                    );
                    root
                }
            }
        };

        LocalStager { uploads_root }
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    pub fn token_dir(&self, token: &UploadToken) -> PathBuf {
        self.uploads_root.join(token.as_str())
    }

    /// Final on-disk path for a filename, after sanitizing.
    pub fn staged_path(&self, token: &UploadToken, filename: &str) -> PathBuf {
        self.token_dir(token).join(keys::sanitize_basename(filename))
    }

    /// Durably write `payload` to `<uploads_root>/<token>/<basename(filename)>`.
    ///
    /// Payloads backed by a temporary file are copied with bounded memory.
    /// Stream payloads are buffered and written as opaque bytes; if the primary
    /// read fails the fallback reader (when present) is read once.
    pub async fn stage(
        &self,
        payload: UploadPayload,
        token: &UploadToken,
        filename: &str,
    ) -> StorageResult<StagedFile> {
        let basename = keys::sanitize_basename(filename);
        let dir = self.token_dir(token);
        let path = dir.join(&basename);
        let start = std::time::Instant::now();

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::StageFailed(format!(
                "Failed to create upload directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let written = match payload.into_body() {
            PayloadBody::Backed(source) => self.stage_streaming(&source, &path).await,
            PayloadBody::Stream { reader, fallback } => {
                self.stage_buffered(reader, fallback, &path).await
            }
        };

        let size = match written {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            error = %cleanup,
                            path = %path.display(),
                            "Failed to remove partially staged file"
                        );
                    }
                }
                return Err(e);
            }
        };

        tracing::info!(
            path = %path.display(),
            token = %token,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local staging successful"
        );

        Ok(StagedFile {
            token: token.clone(),
            basename,
            path,
            size,
        })
    }

    async fn stage_streaming(&self, source: &Path, dest: &Path) -> StorageResult<u64> {
        let mut src = fs::File::open(source).await.map_err(|e| {
            StorageError::StageFailed(format!(
                "Failed to open upload source {}: {}",
                source.display(),
                e
            ))
        })?;

        let mut file = fs::File::create(dest).await.map_err(|e| {
            StorageError::StageFailed(format!("Failed to create file {}: {}", dest.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut src, &mut file).await.map_err(|e| {
            StorageError::StageFailed(format!(
                "Failed to stream upload into {}: {}",
                dest.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::StageFailed(format!("Failed to sync file {}: {}", dest.display(), e))
        })?;

        Ok(bytes_copied)
    }

    async fn stage_buffered(
        &self,
        mut reader: BoxedReader,
        fallback: Option<BoxedReader>,
        dest: &Path,
    ) -> StorageResult<u64> {
        let mut data = Vec::new();
        if let Err(primary) = reader.read_to_end(&mut data).await {
            let Some(mut fallback) = fallback else {
                return Err(StorageError::StageFailed(format!(
                    "Failed to read upload body: {}",
                    primary
                )));
            };

            tracing::warn!(
                error = %primary,
                "Upload body read failed, retrying from raw request body"
            );
            data.clear();
            fallback.read_to_end(&mut data).await.map_err(|e| {
                StorageError::StageFailed(format!(
                    "Failed to read upload body (fallback also failed): {}",
                    e
                ))
            })?;
        }

        let mut file = fs::File::create(dest).await.map_err(|e| {
            StorageError::StageFailed(format!("Failed to create file {}: {}", dest.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::StageFailed(format!("Failed to write file {}: {}", dest.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::StageFailed(format!("Failed to sync file {}: {}", dest.display(), e))
        })?;

        Ok(data.len() as u64)
    }

    /// Delete a staged file and its token directory once empty.
    pub async fn remove(&self, staged: &StagedFile) -> StorageResult<()> {
        match fs::remove_file(staged.path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    staged.path().display(),
                    e
                )))
            }
        }

        let dir = self.token_dir(staged.token());
        if let Err(e) = fs::remove_dir(&dir).await {
            tracing::debug!(
                error = %e,
                dir = %dir.display(),
                "Token directory left in place"
            );
        }

        tracing::info!(
            path = %staged.path().display(),
            token = %staged.token(),
            "Local staged file removed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use intake_core::{AttachedFile, RawBody, UploadRequest};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::tempdir;
    use tokio::io::{AsyncRead, ReadBuf};

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            )))
        }
    }

    fn token(salt: &str) -> UploadToken {
        UploadToken::derive(Utc::now(), salt)
    }

    fn raw_payload(name: &str, bytes: &'static [u8]) -> UploadPayload {
        UploadRequest::raw(RawBody::new(name, Box::pin(io::Cursor::new(bytes))))
            .into_payload()
            .unwrap()
    }

    #[tokio::test]
    async fn test_streaming_stage_round_trips_bytes() {
        let dir = tempdir().unwrap();
        let source_dir = tempdir().unwrap();
        let source = source_dir.path().join("upload-tmp");
        let data: Vec<u8> = (0..=255u8).cycle().take(256 * 1024).collect();
        std::fs::write(&source, &data).unwrap();

        let stager = LocalStager::new(dir.path());
        let token = token("stream");
        let payload = UploadRequest::attached(AttachedFile::backed("big file.bin", &source))
            .into_payload()
            .unwrap();

        let staged = stager.stage(payload, &token, "big file.bin").await.unwrap();

        assert_eq!(staged.basename(), "big_file.bin");
        assert_eq!(staged.size(), data.len() as u64);
        assert_eq!(staged.path(), dir.path().join(token.as_str()).join("big_file.bin"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), data);
    }

    #[tokio::test]
    async fn test_buffered_stage_keeps_binary_bytes() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let token = token("binary");
        let bytes: &'static [u8] = &[0xff, 0xfe, 0x00, 0x80, b'a'];

        let staged = stager
            .stage(raw_payload("blob.bin", bytes), &token, "blob.bin")
            .await
            .unwrap();

        assert_eq!(std::fs::read(staged.path()).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_buffered_stage_uses_fallback_once() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let token = token("fallback");
        let payload = UploadRequest::attached(
            AttachedFile::from_reader("data.csv", Box::pin(FailingReader))
                .with_fallback(Box::pin(io::Cursor::new(b"a,b\n1,2\n".to_vec()))),
        )
        .into_payload()
        .unwrap();

        let staged = stager.stage(payload, &token, "data.csv").await.unwrap();
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_buffered_stage_fails_without_fallback() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let token = token("no-fallback");
        let payload = UploadRequest::attached(AttachedFile::from_reader(
            "data.csv",
            Box::pin(FailingReader),
        ))
        .into_payload()
        .unwrap();

        let result = stager.stage(payload, &token, "data.csv").await;
        assert!(matches!(result, Err(StorageError::StageFailed(_))));
        assert!(!stager.staged_path(&token, "data.csv").exists());
    }

    #[tokio::test]
    async fn test_stage_fails_when_directory_cannot_be_created() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let stager = LocalStager::new(&blocker);
        let result = stager
            .stage(raw_payload("a.txt", b"x"), &token("blocked"), "a.txt")
            .await;
        assert!(matches!(result, Err(StorageError::StageFailed(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_is_neutralized() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let token = token("traversal");

        let staged = stager
            .stage(raw_payload("../../evil.sh", b"echo"), &token, "../../evil.sh")
            .await
            .unwrap();

        assert_eq!(staged.path(), dir.path().join(token.as_str()).join("evil.sh"));
        assert!(staged.path().starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_concurrent_identical_names_do_not_collide() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let now = Utc::now();
        let (t1, t2) = (UploadToken::generate(now), UploadToken::generate(now));

        let (a, b) = tokio::join!(
            stager.stage(raw_payload("same.txt", b"first"), &t1, "same.txt"),
            stager.stage(raw_payload("same.txt", b"second"), &t2, "same.txt"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_remove_deletes_file_and_token_dir() {
        let dir = tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let token = token("remove");
        let staged = stager
            .stage(raw_payload("relay.bin", b"relay"), &token, "relay.bin")
            .await
            .unwrap();

        stager.remove(&staged).await.unwrap();
        assert!(!staged.path().exists());
        assert!(!stager.token_dir(&token).exists());

        // Removing twice is not an error
        stager.remove(&staged).await.unwrap();
    }

    #[test]
    fn test_locator_starts_at_uploads() {
        let stager = LocalStager::new("/srv/app/public/uploads");
        let token = UploadToken::derive(Utc::now(), "locator");
        let staged = StagedFile {
            token: token.clone(),
            basename: "my_report.csv".to_string(),
            path: stager.staged_path(&token, "my report.csv"),
            size: 0,
        };
        assert_eq!(staged.locator(), format!("/uploads/{}/my_report.csv", token));
    }

    #[test]
    fn test_relative_root_is_resolved() {
        let stager = LocalStager::new("public/uploads");
        assert!(stager.uploads_root().is_absolute());
        assert!(stager.uploads_root().ends_with("public/uploads"));
    }
}
