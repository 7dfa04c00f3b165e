//! # Filter Proxy
//!
//! A forward HTTP/HTTPS proxy that blocks configured domains and their
//! subdomains.
//!
//! ## Features
//!
//! - **Domain Blocking**: Blocklisted domains and all their subdomains get a `403`
//! - **HTTPS Support**: CONNECT tunneling, bytes relayed untouched
//! - **Access Log**: One line per connection decision (`OK`, `BLOCKED`, `ERROR`)
//! - **Flexible Logging**: Configurable log levels and output destinations
//!
//! ## Usage
//!
//! ```bash
//! # Run with default config path
//! filter-proxy
//!
//! # Run with custom config and blocklist
//! filter-proxy -c /path/to/config.yaml -b /path/to/blocked.txt
//!
//! # Increase verbosity
//! filter-proxy -vvvv  # trace level
//! ```

use clap::Parser;
use filter_proxy::config::AppConfig;
use filter_proxy::{logging, Blocklist, FileLogSink, ProxyServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// A forward HTTP/HTTPS proxy with domain blocklist filtering.
#[derive(Parser, Debug)]
#[command(name = "filter-proxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Blocked domains file (overrides config)
    #[arg(short, long, env = "BLOCKLIST_PATH")]
    blocklist: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace, -vvvv trace+deps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Converts verbosity count to log level string
    fn log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }
        match self.verbose {
            0 => None,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// Whether to include verbose dependency logging
    fn trace_deps(&self) -> bool {
        self.verbose >= 4
    }
}

/// Application entry point.
#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = load_config(&args);
    if let Some(ref listen) = args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(ref path) = args.blocklist {
        config.blocklist.path = Some(path.clone());
    }

    let _log_guard = match logging::init_logging(&config.logging, args.log_level(), args.trace_deps()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen,
        "Starting filter-proxy"
    );

    let blocklist = match config.blocklist.path {
        Some(ref path) => match Blocklist::load(path) {
            Ok(blocklist) => blocklist,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load blocked domains");
                std::process::exit(1);
            }
        },
        None => Blocklist::default(),
    };
    info!(domains = blocklist.len(), "Loaded blocked domains");

    let (sink, _access_log_guard) = match FileLogSink::open(&config.access_log.path) {
        Ok(opened) => opened,
        Err(e) => {
            error!(
                path = %config.access_log.path.display(),
                error = %e,
                "Failed to open access log"
            );
            std::process::exit(1);
        }
    };

    let server = ProxyServer::new(&config, Arc::new(blocklist), Arc::new(sink));
    if let Err(e) = server.run().await {
        error!(error = %e, "Proxy server error");
        std::process::exit(1);
    }

    info!("Proxy server stopped");
}

/// Load configuration from file or use defaults
fn load_config(args: &Args) -> AppConfig {
    let config_path = args.config.clone().or_else(|| {
        let defaults = [
            "./config.yaml",
            "./config.yml",
            "/etc/filter-proxy/config.yaml",
        ];
        defaults.into_iter().map(PathBuf::from).find(|p| p.exists())
    });

    match config_path {
        Some(path) => match AppConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    }
}
