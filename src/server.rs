//! TCP accept loop.
//!
//! Binds the configured listen address and hands every accepted connection
//! to its own [`ConnectionPipeline`] task.

use crate::access_log::LogSink;
use crate::blocklist::Blocklist;
use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::ConnectionPipeline;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// The proxy server.
pub struct ProxyServer {
    listen: String,
    pipeline: ConnectionPipeline,
}

impl ProxyServer {
    /// Creates a server for `config` that filters against `blocklist` and
    /// records every connection to `sink`.
    pub fn new(config: &AppConfig, blocklist: Arc<Blocklist>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            listen: config.server.listen.clone(),
            pipeline: ConnectionPipeline::new(blocklist, sink, config.connect_timeout()),
        }
    }

    /// Binds the listener and serves until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.listen).await?;
        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Accepts connections on `listener` until `shutdown` completes.
    ///
    /// Connections already in flight keep running after the loop stops.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(listen = %local_addr, "Proxy server listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            let client_addr = peer.to_string();
            debug!(client = %client_addr, "Connection accepted");
            pipeline.handle(stream, &client_addr).await;
            debug!(client = %client_addr, "Connection closed");
        });
    }
}
