//! Connection-level reachability check.

use std::time::Duration;

use tokio::net::TcpStream;

/// Timeout used before every replication attempt.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Attempt a single TCP connection to `host:port`.
///
/// Returns `false` on refusal, resolution failure or timeout. No application
/// handshake is performed and the connection is dropped immediately.
pub async fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(host = %host, port = port, error = %e, "Connectivity probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(
                host = %host,
                port = port,
                timeout_ms = timeout.as_millis() as u64,
                "Connectivity probe timed out"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(is_reachable("127.0.0.1", port, PROBE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!is_reachable("127.0.0.1", port, PROBE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn unresolvable_host_is_unreachable() {
        assert!(!is_reachable("host.invalid", 22, PROBE_TIMEOUT).await);
    }
}
