use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ssh2::{ErrorCode, Session, Sftp};

use crate::error::{ReplicationError, ReplicationResult};
use crate::transport::{MirrorTarget, MirrorTransport};

/// libssh2's LIBSSH2_ERROR_TIMEOUT
const SESSION_TIMEOUT_CODE: i32 = -9;
const REMOTE_DIR_MODE: i32 = 0o755;

/// SFTP transport backed by libssh2.
///
/// libssh2 is blocking, so every push runs under `spawn_blocking`. The target's
/// timeout bounds the TCP connect and each blocking session call (handshake,
/// auth, every read and write). A large file that keeps making progress is
/// never cut off.
#[derive(Debug, Clone, Default)]
pub struct SftpTransport;

impl SftpTransport {
    pub fn new() -> Self {
        SftpTransport
    }
}

#[async_trait]
impl MirrorTransport for SftpTransport {
    async fn push(&self, target: &MirrorTarget) -> ReplicationResult<()> {
        let start = Instant::now();
        let blocking_target = target.clone();

        let result = tokio::task::spawn_blocking(move || push_blocking(&blocking_target)).await;

        match result {
            Ok(Ok(bytes)) => {
                tracing::info!(
                    host = %target.host,
                    remote_path = %target.remote_path.display(),
                    size_bytes = bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "SFTP transfer successful"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(join_err) => Err(ReplicationError::Transfer(format!(
                "SFTP task failed: {}",
                join_err
            ))),
        }
    }
}

fn push_blocking(target: &MirrorTarget) -> ReplicationResult<u64> {
    let session = open_session(target)?;
    let sftp = session.sftp().map_err(map_ssh_error(target.timeout))?;
    ensure_remote_dir(&sftp, &target.remote_dir, target.timeout)?;

    let mut local = File::open(&target.local_path)?;
    let mut remote = sftp
        .create(&target.remote_path)
        .map_err(map_ssh_error(target.timeout))?;
    copy_file(&mut local, &mut remote)
}

/// Connect, handshake and authenticate.
fn open_session(target: &MirrorTarget) -> ReplicationResult<Session> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            ReplicationError::Transfer(format!("No address found for {}", target.host))
        })?;

    let tcp = TcpStream::connect_timeout(&addr, target.timeout)?;

    let mut session = Session::new().map_err(map_ssh_error(target.timeout))?;
    session.set_timeout(timeout_millis(target.timeout));
    session.set_tcp_stream(tcp);
    session.handshake().map_err(map_ssh_error(target.timeout))?;

    match target.password.as_deref() {
        Some(password) => session
            .userauth_password(&target.username, password)
            .map_err(map_ssh_error(target.timeout))?,
        None => session
            .userauth_agent(&target.username)
            .map_err(map_ssh_error(target.timeout))?,
    }

    if !session.authenticated() {
        return Err(ReplicationError::Transfer(format!(
            "Authentication failed for {}@{}",
            target.username, target.host
        )));
    }

    Ok(session)
}

/// Copy with no overall deadline; stalls surface as I/O errors from the session.
fn copy_file(local: &mut impl Read, remote: &mut impl Write) -> ReplicationResult<u64> {
    let bytes = io::copy(local, remote)?;
    remote.flush()?;
    Ok(bytes)
}

fn ensure_remote_dir(sftp: &Sftp, dir: &Path, timeout: Duration) -> ReplicationResult<()> {
    if let Err(mkdir_err) = sftp.mkdir(dir, REMOTE_DIR_MODE) {
        // Concurrent uploads may have created it first
        match sftp.stat(dir) {
            Ok(stat) if stat.is_dir() => {}
            _ => return Err(map_ssh_error(timeout)(mkdir_err)),
        }
    }
    Ok(())
}

fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

fn map_ssh_error(timeout: Duration) -> impl Fn(ssh2::Error) -> ReplicationError {
    move |err| match err.code() {
        ErrorCode::Session(SESSION_TIMEOUT_CODE) => ReplicationError::Timeout(timeout),
        _ => ReplicationError::Transfer(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target(port: u16) -> MirrorTarget {
        MirrorTarget {
            host: "127.0.0.1".to_string(),
            port,
            username: "mirror".to_string(),
            password: Some("secret".to_string()),
            timeout: Duration::from_millis(500),
            local_path: PathBuf::from("/nonexistent/file"),
            remote_dir: PathBuf::from("/srv/uploads/abc"),
            remote_path: PathBuf::from("/srv/uploads/abc/file"),
        }
    }

    #[test]
    fn timeout_code_maps_to_timeout() {
        let err = ssh2::Error::new(ErrorCode::Session(SESSION_TIMEOUT_CODE), "timed out");
        let mapped = map_ssh_error(Duration::from_secs(5))(err);
        assert!(matches!(mapped, ReplicationError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn other_codes_map_to_transfer() {
        let err = ssh2::Error::new(ErrorCode::Session(-18), "auth failed");
        let mapped = map_ssh_error(Duration::from_secs(5))(err);
        assert!(matches!(mapped, ReplicationError::Transfer(_)));
    }

    #[test]
    fn huge_timeouts_saturate() {
        assert_eq!(timeout_millis(Duration::from_secs(2)), 2000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[tokio::test]
    async fn refused_connection_is_not_a_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = SftpTransport::new().push(&target(port)).await.unwrap_err();
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Accepts the TCP connection but never speaks SSH
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let start = std::time::Instant::now();
        let err = SftpTransport::new().push(&target(port)).await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
        assert!(start.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    /// Writer that sleeps on every chunk, so the copy outlasts the session timeout.
    struct SlowWriter {
        written: Vec<u8>,
        delay: Duration,
    }

    impl Write for SlowWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            let n = buf.len().min(1024);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn slow_transfer_is_not_cut_off() {
        let limit = target(22).timeout;
        let data = vec![7u8; 16 * 1024];
        let mut remote = SlowWriter {
            written: Vec::new(),
            delay: Duration::from_millis(50),
        };

        let start = std::time::Instant::now();
        let copied = copy_file(&mut data.as_slice(), &mut remote).unwrap();

        assert!(start.elapsed() > limit);
        assert_eq!(copied, data.len() as u64);
        assert_eq!(remote.written, data);
    }
}
