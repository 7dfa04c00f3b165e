//! Bidirectional byte relay between two open streams.
//!
//! Each direction runs as its own task and ends independently: when one
//! side reaches end-of-stream, only the write side of the other endpoint is
//! shut down, so data still flowing the opposite way is not cut off. The
//! relay returns once both directions have finished.
//!
//! Half-close goes through [`AsyncWriteExt::shutdown`]. For TCP that is a
//! `shutdown(Write)`; transports without a half-close close their write path
//! entirely.

use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/// Bytes moved in each direction by a finished relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub a_to_b: u64,
    pub b_to_a: u64,
}

/// Copies bytes between `a` and `b` until both directions reach
/// end-of-stream.
///
/// Transport errors end the affected direction and are otherwise ignored;
/// they are the normal outcome of a peer going away.
pub async fn relay<A, B>(a: A, b: B) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (a_read, a_write) = io::split(a);
    let (b_read, b_write) = io::split(b);

    let forward = tokio::spawn(pump(a_read, b_write, "a->b"));
    let backward = tokio::spawn(pump(b_read, a_write, "b->a"));

    let (forward, backward) = tokio::join!(forward, backward);

    let stats = RelayStats {
        a_to_b: forward.unwrap_or_else(|e| {
            warn!(error = %e, "Relay task a->b failed");
            0
        }),
        b_to_a: backward.unwrap_or_else(|e| {
            warn!(error = %e, "Relay task b->a failed");
            0
        }),
    };
    trace!(a_to_b = stats.a_to_b, b_to_a = stats.b_to_a, "Relay finished");
    stats
}

async fn pump<R, W>(mut reader: R, mut writer: W, direction: &'static str) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = match io::copy(&mut reader, &mut writer).await {
        Ok(n) => n,
        Err(e) => {
            debug!(direction, error = %e, "Relay direction ended with error");
            0
        }
    };

    // no more data from this side; let the peer see EOF
    if let Err(e) = writer.shutdown().await {
        trace!(direction, error = %e, "Half-close failed");
    }

    copied
}
