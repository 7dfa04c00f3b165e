//! Target resolution for proxied requests.
//!
//! The target of a request is taken from, in order:
//! 1. The `host:port` authority of a CONNECT request
//! 2. An absolute `http://` or `https://` request-target
//! 3. The `Host` header
//!
//! Resolution never fails. A request with no usable host resolves to an
//! empty host, which is never blocked and fails at dial time.
//!
//! Absolute targets are split by hand rather than validated: once the scheme
//! prefix matches, host, port, path and query always come from the target,
//! whatever characters or length it carries.

use std::fmt;

/// Port assumed for plain HTTP targets.
pub const DEFAULT_HTTP_PORT: &str = "80";

/// Port assumed for HTTPS absolute URIs and CONNECT targets.
pub const DEFAULT_HTTPS_PORT: &str = "443";

/// Resolved destination of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or IP literal, original case preserved.
    pub host: String,

    /// Numeric port string.
    pub port: String,
}

impl Target {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// The `host:port` string to dial, with IPv6 literals bracketed.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr())
    }
}

/// Resolves the target of a request from its method, request-target and
/// `Host` header value.
pub fn resolve(method: &str, target: &str, host_header: Option<&str>) -> Target {
    if method.eq_ignore_ascii_case("CONNECT") {
        let (host, port) = parse_host_port(target, DEFAULT_HTTPS_PORT);
        return Target::new(host, port);
    }

    if let Some(absolute) = AbsoluteTarget::split(target) {
        let (host, port) = absolute.host_port();
        return Target::new(host, port);
    }

    match host_header.map(str::trim) {
        Some(value) if !value.is_empty() => {
            let (host, port) = parse_host_port(value, DEFAULT_HTTP_PORT);
            Target::new(host, port)
        }
        _ => Target::new("", DEFAULT_HTTP_PORT),
    }
}

/// Converts an absolute request-target into origin form.
///
/// `http://a.com/x?y=1` becomes `/x?y=1` and `http://a.com` becomes `/`.
/// Anything that is not an absolute HTTP(S) URI is returned unchanged.
pub fn clean_request_uri(target: &str) -> String {
    let Some(absolute) = AbsoluteTarget::split(target) else {
        return target.to_string();
    };

    let mut relative = match absolute.path {
        "" => "/".to_string(),
        path => path.to_string(),
    };
    if !absolute.query.is_empty() {
        relative.push('?');
        relative.push_str(absolute.query);
    }
    relative
}

/// An `http://` or `https://` request-target cut into its raw parts.
#[derive(Debug, PartialEq, Eq)]
struct AbsoluteTarget<'a> {
    https: bool,
    authority: &'a str,
    path: &'a str,
    query: &'a str,
}

impl<'a> AbsoluteTarget<'a> {
    /// Fragment first, then query, then the authority up to the first `/`.
    fn split(target: &'a str) -> Option<Self> {
        let (https, rest) = if let Some(rest) = target.strip_prefix("http://") {
            (false, rest)
        } else if let Some(rest) = target.strip_prefix("https://") {
            (true, rest)
        } else {
            return None;
        };

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = match rest.find('/') {
            Some(slash) => rest.split_at(slash),
            None => (rest, ""),
        };

        Some(Self {
            https,
            authority,
            path,
            query,
        })
    }

    /// Host without brackets and port, defaulted by scheme.
    fn host_port(&self) -> (String, String) {
        let default_port = if self.https {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        };
        let host_port = self
            .authority
            .rsplit_once('@')
            .map_or(self.authority, |(_, host_port)| host_port);
        let (host, port) = parse_host_port(host_port, default_port);
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        (host, port)
    }
}

/// Splits `host:port`, falling back to the whole input and `default_port`
/// when it carries no port.
pub fn parse_host_port(addr: &str, default_port: &str) -> (String, String) {
    match split_host_port(addr) {
        Some((host, port)) if !port.is_empty() => (host.to_string(), port.to_string()),
        Some((host, _)) => (host.to_string(), default_port.to_string()),
        None => (addr.to_string(), default_port.to_string()),
    }
}

/// Splits `host:port` or `[ipv6]:port` into its parts.
///
/// Returns `None` when there is no port separator, or when an unbracketed
/// host contains more than one colon (a bare IPv6 literal).
pub fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = after.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}
