//! Request head parsing.
//!
//! Only the request line and header block are consumed. Anything the client
//! sent after the blank line (a request body, or early tunnel bytes) stays
//! buffered in the reader for the relay to carry.

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Parsed request head, immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Upper-cased method token.
    pub method: String,

    /// Request-target exactly as received.
    pub target: String,

    /// Protocol version token, e.g. `HTTP/1.1`.
    pub version: String,

    /// Raw header lines in arrival order, line terminators included.
    pub header_lines: Vec<Bytes>,

    /// Trimmed value of the `Host` header, if one was sent.
    pub host_header: Option<String>,
}

impl Request {
    /// Reads one request head from `reader`.
    ///
    /// Fails with [`ProxyError::MalformedRequest`] when the stream ends
    /// before a complete request line, or the line has fewer than three
    /// fields. Header lines are not validated.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(_) if line.ends_with(b"\n") => {}
            _ => return Err(ProxyError::malformed("Failed to read request")),
        }

        let request_line =
            std::str::from_utf8(&line).map_err(|_| ProxyError::malformed("Invalid request line"))?;
        let mut fields = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(ProxyError::malformed("Invalid request line"));
        };

        let method = method.to_ascii_uppercase();
        let target = target.to_string();
        let version = version.to_string();

        let mut header_lines = Vec::new();
        let mut host_header = None;
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(_) if line.ends_with(b"\n") => {}
                // end of stream, a read error, or a dangling partial line
                _ => break,
            }
            if line == b"\r\n" || line == b"\n" {
                break;
            }
            if let Some(value) = host_value(&line) {
                host_header = Some(value);
            }
            header_lines.push(Bytes::from(line));
        }

        Ok(Self {
            method,
            target,
            version,
            header_lines,
            host_header,
        })
    }

    pub fn is_connect(&self) -> bool {
        self.method == "CONNECT"
    }

    pub fn host_header(&self) -> Option<&str> {
        self.host_header.as_deref()
    }
}

fn host_value(line: &[u8]) -> Option<String> {
    const NAME: &[u8] = b"host:";
    if line.len() < NAME.len() || !line[..NAME.len()].eq_ignore_ascii_case(NAME) {
        return None;
    }
    std::str::from_utf8(&line[NAME.len()..])
        .ok()
        .map(|value| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn parse(raw: &[u8]) -> Result<Request> {
        let mut reader = raw;
        Request::read_from(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_absolute_form() {
        let req = parse(
            b"get http://example.com/a?b=1 HTTP/1.1\r\nHost: Example.com\r\nAccept: */*\r\n\r\n",
        )
        .await
        .unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "http://example.com/a?b=1");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.host_header(), Some("Example.com"));
        assert_eq!(
            req.header_lines,
            vec![
                Bytes::from_static(b"Host: Example.com\r\n"),
                Bytes::from_static(b"Accept: */*\r\n"),
            ]
        );
        assert!(!req.is_connect());
    }

    #[tokio::test]
    async fn test_parse_connect() {
        let req = parse(b"CONNECT site.com:443 HTTP/1.1\r\n\r\n").await.unwrap();
        assert!(req.is_connect());
        assert_eq!(req.target, "site.com:443");
        assert!(req.header_lines.is_empty());
        assert_eq!(req.host_header(), None);
    }

    #[tokio::test]
    async fn test_host_header_name_is_case_insensitive() {
        let req = parse(b"GET / HTTP/1.1\nhOST:   site.com:8080  \n\n").await.unwrap();
        assert_eq!(req.host_header(), Some("site.com:8080"));
        assert_eq!(req.header_lines, vec![Bytes::from_static(b"hOST:   site.com:8080  \n")]);
    }

    #[tokio::test]
    async fn test_two_fields_is_malformed() {
        let err = parse(b"GET /\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ProxyError::MalformedRequest { .. }));
    }

    #[tokio::test]
    async fn test_stream_closed_before_request_line() {
        assert!(matches!(
            parse(b"").await,
            Err(ProxyError::MalformedRequest { .. })
        ));
        assert!(matches!(
            parse(b"GET / HTTP/1.1").await,
            Err(ProxyError::MalformedRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_headers_end_at_stream_close() {
        let req = parse(b"GET / HTTP/1.0\r\nX-One: 1\r\nX-Partial").await.unwrap();
        assert_eq!(req.header_lines, vec![Bytes::from_static(b"X-One: 1\r\n")]);
    }

    #[tokio::test]
    async fn test_body_left_in_reader() {
        let raw: &[u8] = b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let mut reader = raw;
        let req = Request::read_from(&mut reader).await.unwrap();
        assert_eq!(req.method, "POST");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"hello");
    }
}
