//! Per-connection request handling.
//!
//! Every accepted connection goes through the same steps: parse the request
//! head, resolve the target, check the blocklist, then either forward the
//! HTTP request or open a CONNECT tunnel. Nothing is sent to a target before
//! the blocklist has approved it and the dial has succeeded.
//!
//! All failures stay local to the connection. They end in an error status
//! line and an access log record, never in an error returned to the caller.

use crate::access_log::{LogRecord, LogSink, Status};
use crate::blocklist::Blocklist;
use crate::error::ProxyError;
use crate::forward::forward_http;
use crate::request::Request;
use crate::resolver::resolve;
use crate::response::send_error;
use crate::tunnel::open_tunnel;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

/// Handles proxied connections against a fixed blocklist and log sink.
///
/// Cheap to clone; clones share the blocklist and the sink.
#[derive(Clone)]
pub struct ConnectionPipeline {
    blocklist: Arc<Blocklist>,
    sink: Arc<dyn LogSink>,
    connect_timeout: Duration,
}

impl ConnectionPipeline {
    pub fn new(blocklist: Arc<Blocklist>, sink: Arc<dyn LogSink>, connect_timeout: Duration) -> Self {
        Self {
            blocklist,
            sink,
            connect_timeout,
        }
    }

    /// Serves one client connection to completion.
    ///
    /// Returns once the response has been relayed in full (or an error
    /// status written), with both the client and target streams closed.
    pub async fn handle<S>(&self, stream: S, client_addr: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session = Session {
            client_addr,
            sink: self.sink.as_ref(),
            connect_timeout: self.connect_timeout,
        };
        let mut client = BufReader::new(stream);

        let request = match Request::read_from(&mut client).await {
            Ok(request) => request,
            Err(e) => {
                let detail = match e {
                    ProxyError::MalformedRequest { reason } => reason,
                    other => other.to_string(),
                };
                session.log("", "", Status::Error, detail);
                send_error(&mut client, 400, "Bad Request").await;
                return;
            }
        };

        let target = resolve(&request.method, &request.target, request.host_header());
        debug!(
            client = %client_addr,
            method = %request.method,
            addr = %target,
            "Request received"
        );

        if self.blocklist.is_blocked(&target.host) {
            session.log(&target.host, &request.method, Status::Blocked, "Domain is blocked");
            send_error(&mut client, 403, "Forbidden").await;
            return;
        }

        if request.is_connect() {
            open_tunnel(&session, client, &request, &target).await;
        } else {
            forward_http(&session, client, &request, &target).await;
        }
    }
}

/// Per-connection state shared by the forwarding paths.
pub(crate) struct Session<'a> {
    client_addr: &'a str,
    sink: &'a dyn LogSink,
    pub(crate) connect_timeout: Duration,
}

impl Session<'_> {
    /// Records a decision for this connection in the access log.
    pub(crate) fn log(&self, host: &str, method: &str, status: Status, detail: impl Into<String>) {
        let record = LogRecord::new(self.client_addr, host, method, status, detail);
        match status {
            Status::Ok => info!(
                target: "access_log",
                client = %record.client_addr,
                host = %record.host,
                method = %record.method,
                status = %record.status,
                detail = %record.detail,
                "Connection handled"
            ),
            Status::Blocked | Status::Error => warn!(
                target: "access_log",
                client = %record.client_addr,
                host = %record.host,
                method = %record.method,
                status = %record.status,
                detail = %record.detail,
                "Connection handled"
            ),
        }
        self.sink.record(&record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<LogRecord>>,
    }

    impl LogSink for RecordingSink {
        fn record(&self, record: &LogRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    fn pipeline(domains: &[&str]) -> (ConnectionPipeline, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = ConnectionPipeline::new(
            Arc::new(Blocklist::from_domains(domains.iter().copied())),
            sink.clone(),
            Duration::from_secs(2),
        );
        (pipeline, sink)
    }

    async fn exchange(pipeline: &ConnectionPipeline, raw: &[u8]) -> String {
        let (mut client, server) = duplex(4096);
        client.write_all(raw).await.unwrap();
        client.shutdown().await.unwrap();

        pipeline.handle(server, "10.0.0.1:5000").await;

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_malformed_request_line() {
        let (pipeline, sink) = pipeline(&[]);
        let response = exchange(&pipeline, b"GET /\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Error);
        assert_eq!(records[0].detail, "Invalid request line");
        assert_eq!(records[0].client_addr, "10.0.0.1:5000");
        assert!(records[0].host.is_empty());
    }

    #[tokio::test]
    async fn test_blocked_subdomain() {
        let (pipeline, sink) = pipeline(&["blocked.example"]);
        let response = exchange(
            &pipeline,
            b"GET http://www.blocked.example/ HTTP/1.1\r\nHost: www.blocked.example\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 403 Forbidden\r\n"));
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Blocked);
        assert_eq!(records[0].host, "www.blocked.example");
        assert_eq!(records[0].method, "GET");
    }

    #[tokio::test]
    async fn test_absolute_target_wins_over_host_header() {
        let (pipeline, sink) = pipeline(&["blocked.com"]);
        let response = exchange(
            &pipeline,
            b"GET http://blocked.com/<x> HTTP/1.1\r\nHost: allowed.com\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 403 Forbidden\r\n"));
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Blocked);
        assert_eq!(records[0].host, "blocked.com");
    }

    #[tokio::test]
    async fn test_missing_host_fails_at_dial() {
        let (pipeline, sink) = pipeline(&["example.com"]);
        let response = exchange(&pipeline, b"GET /p HTTP/1.1\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Error);
        assert!(records[0].detail.starts_with("Failed to connect"));
    }
}
