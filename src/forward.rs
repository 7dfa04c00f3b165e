//! Plain HTTP forwarding.
//!
//! The request line is rewritten to origin form and sent to the target with
//! the client's header lines unchanged. The request body and the response
//! are then carried by the relay without interpretation.

use crate::access_log::Status;
use crate::dial::dial;
use crate::pipeline::Session;
use crate::relay::relay;
use crate::request::Request;
use crate::resolver::{clean_request_uri, Target};
use crate::response::send_error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Serializes the request head sent to the target.
pub fn rewrite_head(request: &Request, relative_uri: &str) -> Vec<u8> {
    let request_line = format!("{} {} {}\r\n", request.method, relative_uri, request.version);
    let headers_len: usize = request.header_lines.iter().map(|line| line.len()).sum();

    let mut head = Vec::with_capacity(request_line.len() + headers_len + 2);
    head.extend_from_slice(request_line.as_bytes());
    for line in &request.header_lines {
        head.extend_from_slice(line);
    }
    head.extend_from_slice(b"\r\n");
    head
}

pub(crate) async fn forward_http<S>(
    session: &Session<'_>,
    mut client: BufReader<S>,
    request: &Request,
    target: &Target,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut upstream = match dial(target, session.connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            session.log(&target.host, &request.method, Status::Error, e.to_string());
            send_error(&mut client, 502, "Bad Gateway").await;
            return;
        }
    };

    let relative_uri = clean_request_uri(&request.target);
    let head = rewrite_head(request, &relative_uri);
    if let Err(e) = upstream.write_all(&head).await {
        debug!(addr = %target, error = %e, "Failed to write request head");
        session.log(
            &target.host,
            &request.method,
            Status::Error,
            "Failed to forward request",
        );
        send_error(&mut client, 502, "Bad Gateway").await;
        return;
    }

    // the attempt is what gets logged; relay outcomes are not
    session.log(&target.host, &request.method, Status::Ok, relative_uri.as_str());

    let stats = relay(client, upstream).await;
    debug!(
        addr = %target,
        sent = stats.a_to_b,
        received = stats.b_to_a,
        "HTTP exchange finished"
    );
}
