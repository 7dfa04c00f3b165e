//! Responses the proxy writes on its own behalf.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Reply sent once a CONNECT target has been dialed.
pub const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Renders a minimal plain-text error response.
pub fn error_response(code: u16, text: &str) -> String {
    format!(
        "HTTP/1.1 {code} {text}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{code} {text}\n"
    )
}

/// Writes an error response to `conn`.
///
/// The connection is closing either way, so write failures are only
/// logged.
pub async fn send_error<W>(conn: &mut W, code: u16, text: &str)
where
    W: AsyncWrite + Unpin,
{
    let response = error_response(code, text);
    let result = match conn.write_all(response.as_bytes()).await {
        Ok(()) => conn.flush().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        debug!(code, error = %e, "Failed to write error response");
    }
}
