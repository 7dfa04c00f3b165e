//! Outbound connections to resolved targets.

use crate::error::{ProxyError, Result};
use crate::resolver::Target;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Connects to `target`, giving up after `timeout`.
///
/// An empty host fails here as an ordinary dial error.
pub async fn dial(target: &Target, timeout: Duration) -> Result<TcpStream> {
    let addr = target.addr();
    trace!(addr = %addr, "Dialing target");

    match tokio::time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(ProxyError::Dial { addr, source }),
        Err(_) => Err(ProxyError::Dial {
            addr,
            source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_listening_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let stream = dial(&Target::new("127.0.0.1", port), Duration::from_secs(5)).await;
        assert!(stream.is_ok());
    }

    #[tokio::test]
    async fn test_dial_empty_host_fails() {
        let err = dial(&Target::new("", "80"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Dial { ref addr, .. } if addr == ":80"));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let err = dial(&Target::new("127.0.0.1", port), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to connect to 127.0.0.1:"));
    }
}
