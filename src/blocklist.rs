//! Domain blocklist and its suffix matcher.
//!
//! An entry blocks the domain itself and every subdomain of it: an entry
//! for `example.com` matches `example.com` and `a.b.example.com` but not
//! `notexample.com`.

use crate::error::Result;
use crate::resolver::split_host_port;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Immutable set of lower-cased blocked domains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocklist {
    domains: HashSet<String>,
}

impl Blocklist {
    /// Builds a blocklist from domain strings, trimming and lower-casing each.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Loads a blocklist file: one domain per line, `#` starts a comment line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let blocklist = Self::from_domains(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        );
        debug!(
            path = %path.as_ref().display(),
            domains = blocklist.len(),
            "Blocklist loaded"
        );
        Ok(blocklist)
    }

    /// Number of distinct blocked domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Returns true when `host`, or any parent domain of it, is listed.
    ///
    /// A `:port` suffix is ignored. An empty host is never blocked.
    pub fn is_blocked(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = match split_host_port(&host) {
            Some((name, _)) => name,
            None => host.as_str(),
        };
        if host.is_empty() {
            return false;
        }

        if self.domains.contains(host) {
            return true;
        }

        // Walk the parent domains right-aligned: b.example.com, example.com, com
        host.match_indices('.')
            .map(|(dot, _)| &host[dot + 1..])
            .any(|parent| self.domains.contains(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn blocklist(domains: &[&str]) -> Blocklist {
        Blocklist::from_domains(domains.iter().copied())
    }

    #[test]
    fn test_exact_and_subdomain_match() {
        let list = blocklist(&["example.com"]);
        assert!(list.is_blocked("example.com"));
        assert!(list.is_blocked("www.example.com"));
        assert!(list.is_blocked("a.b.example.com"));
        assert!(!list.is_blocked("notexample.com"));
        assert!(!list.is_blocked("example.com.evil.org"));
        assert!(!list.is_blocked("com"));
    }

    #[test]
    fn test_case_and_port_are_ignored() {
        let list = blocklist(&["Ads.Example.COM"]);
        assert!(list.is_blocked("ads.example.com"));
        assert!(list.is_blocked("ADS.EXAMPLE.COM:443"));
        assert!(list.is_blocked("cdn.ads.example.com:8080"));
        assert!(!list.is_blocked("example.com"));
    }

    #[test]
    fn test_empty_host_never_blocked() {
        let list = blocklist(&["example.com", "com"]);
        assert!(!list.is_blocked(""));
        assert!(!list.is_blocked(":80"));
    }

    #[test]
    fn test_single_label_host() {
        let list = blocklist(&["example.com"]);
        assert!(!list.is_blocked("localhost"));

        let list = blocklist(&["localhost"]);
        assert!(list.is_blocked("localhost"));
        assert!(list.is_blocked("localhost:3000"));
    }

    #[test]
    fn test_suffix_property() {
        // blocked iff host == d or host ends with "." + d
        let entries = ["example.com", "tracker.net", "io"];
        let hosts = [
            "example.com",
            "x.example.com",
            "xexample.com",
            "tracker.net",
            "a.tracker.net",
            "tracker.net.org",
            "crates.io",
            "io",
            "ion",
            "",
        ];
        for entry in entries {
            let list = blocklist(&[entry]);
            for host in hosts {
                let expected = host == entry || host.ends_with(&format!(".{}", entry));
                assert_eq!(
                    list.is_blocked(host),
                    expected,
                    "host {:?} against entry {:?}",
                    host,
                    entry
                );
            }
        }
    }

    #[test]
    fn test_empty_blocklist() {
        let list = Blocklist::default();
        assert!(list.is_empty());
        assert!(!list.is_blocked("example.com"));
    }

    #[test]
    fn test_load_skips_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# ad networks").unwrap();
        writeln!(file, "Ads.Example.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   tracker.net   ").unwrap();
        writeln!(file, "  # indented comment").unwrap();
        file.flush().unwrap();

        let list = Blocklist::load(file.path()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_blocked("ads.example.com"));
        assert!(list.is_blocked("pixel.tracker.net"));
        assert!(!list.is_blocked("example.com"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Blocklist::load("/no/such/blocklist.txt").is_err());
    }
}
