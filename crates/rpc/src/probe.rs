//! Farmer liveness probe.
//!
//! A bare TCP connect, independent of any application protocol: `true` on
//! connect, `false` on refusal, unreachable host, or timeout.  No TLS
//! attempt, no payload.  The socket is owned exclusively for the probe's
//! lifetime and released on every exit path.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// Test whether a listener exists at `address`'s host:port.
///
/// Connection errors are normalized to `false` here rather than surfaced —
/// an unreachable endpoint and a down endpoint are the same answer to the
/// question this probe asks.
pub async fn is_reachable(address: &Url, limit: Duration) -> bool {
    let Some(host) = address.host_str() else {
        debug!(%address, "probe address has no host");
        return false;
    };
    let Some(port) = address.port_or_known_default() else {
        debug!(%address, "probe address has no port");
        return false;
    };

    match tokio::time::timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            // Connect succeeded; close immediately, nothing to say.
            drop(stream);
            true
        }
        Ok(Err(err)) => {
            debug!(%address, %err, "probe connect failed");
            false
        }
        // Timeout drops the pending connect, releasing the socket.
        Err(_) => {
            debug!(%address, "probe timed out");
            false
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const PROBE_LIMIT: Duration = Duration::from_secs(2);

    async fn local_listener() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("https://{addr}")).unwrap();
        (listener, url)
    }

    #[tokio::test]
    async fn reachable_when_listener_accepts() {
        let (listener, url) = local_listener().await;

        let (reachable, _) = tokio::join!(is_reachable(&url, PROBE_LIMIT), listener.accept());
        assert!(reachable);
    }

    #[tokio::test]
    async fn unreachable_when_nothing_listens() {
        // Bind then drop to get a port that is very likely closed.
        let (listener, url) = local_listener().await;
        drop(listener);

        assert!(!is_reachable(&url, PROBE_LIMIT).await);
    }

    #[tokio::test]
    async fn probe_closes_its_socket_after_success() {
        let (listener, url) = local_listener().await;

        let (reachable, observed) = tokio::join!(is_reachable(&url, PROBE_LIMIT), async {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1];
            // EOF on the accepted side proves the probe released its end.
            tokio::time::timeout(PROBE_LIMIT, stream.read(&mut buf)).await
        });

        assert!(reachable);
        let read = observed.expect("probe left its socket open").unwrap();
        assert_eq!(read, 0, "probe wrote a payload it should not have");
    }

    #[tokio::test]
    async fn address_without_host_is_unreachable() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert!(!is_reachable(&url, PROBE_LIMIT).await);
    }
}
