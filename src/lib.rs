//! # Filter Proxy Library
//!
//! A forward HTTP/HTTPS proxy that refuses connections to blocklisted
//! domains. Plain HTTP requests are rewritten to origin form and forwarded;
//! CONNECT requests become opaque byte tunnels.
//!
//! ## Modules
//!
//! - [`pipeline`]: Per-connection entry point (parse, resolve, filter, dispatch)
//! - [`request`]: Request line and header parsing
//! - [`resolver`]: Target host/port resolution and request-target cleanup
//! - [`blocklist`]: Domain blocklist with parent-domain matching
//! - [`relay`]: Bidirectional copy with half-close
//! - [`access_log`]: Per-connection records and their sinks
//! - [`server`]: TCP accept loop
//! - [`config`], [`error`], [`logging`]: Ambient plumbing
//!
//! ## Example
//!
//! ```ignore
//! use filter_proxy::{AppConfig, Blocklist, FileLogSink, ProxyServer};
//! use std::sync::Arc;
//!
//! let config = AppConfig::load("config.yaml")?;
//! let blocklist = Arc::new(Blocklist::load("blocked.txt")?);
//! let (sink, _guard) = FileLogSink::open(&config.access_log.path)?;
//!
//! ProxyServer::new(&config, blocklist, Arc::new(sink)).run().await?;
//! ```
//!
//! ## Blocking
//!
//! An entry such as `example.com` blocks `example.com` and every subdomain
//! (`www.example.com`, `a.b.example.com`) but not `notexample.com`. Blocked
//! requests get a `403` and are never forwarded.

pub mod access_log;
pub mod blocklist;
pub mod config;
pub mod dial;
pub mod error;
pub mod forward;
pub mod logging;
pub mod pipeline;
pub mod relay;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod tunnel;

pub use access_log::{FileLogSink, LogRecord, LogSink, Status};
pub use blocklist::Blocklist;
pub use config::AppConfig;
pub use error::{ProxyError, Result};
pub use pipeline::ConnectionPipeline;
pub use resolver::{clean_request_uri, resolve, Target};
pub use server::ProxyServer;
