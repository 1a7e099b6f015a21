//! Driver URL parsing (§6 External Interfaces, C15).
//!
//! ```text
//! <scheme>://[user[:password]@]host[:port][/db][?opt=v&...]
//! ```
//!
//! `scheme` is `neo4j` or `memgraph`, optionally suffixed `+ssl` (TLS, verify
//! the server certificate) or `+ssc` (TLS, self-signed certificates
//! accepted). A bare scheme carries no TLS at all.

use std::collections::HashMap;

use url::Url;

use crate::error::Error;
use crate::Result;

/// Which graph server family a URL addresses. The core treats both
/// identically at the wire level; this is kept for diagnostics and for
/// collaborators that branch on it (e.g. picking dialect quirks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Neo4j,
    Memgraph,
}

/// A parsed driver URL: everything needed to dial and authenticate a Bolt
/// connection (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub family: Family,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// TLS is in play at all (`+ssl` or `+ssc`).
    pub secure: bool,
    /// Whether the peer certificate is verified. Always `true` for plain
    /// (non-TLS) endpoints, since there's no certificate to skip (§6 seed
    /// case 5 table only tabulates this for the TLS schemes, but callers
    /// that branch on `verify_cert` alone — without checking `secure` —
    /// should see the conservative value).
    pub verify_cert: bool,
    pub options: HashMap<String, String>,
}

impl Endpoint {
    /// Parse a driver URL per §6's grammar.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = Url::parse(raw).map_err(|e| Error::InvalidUrl(raw.to_string(), e.to_string()))?;
        let (family, secure, verify_cert) = scheme_parts(raw, parsed.scheme())?;

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(raw.to_string(), "missing host".into()))?
            .to_string();
        let port = parsed.port().unwrap_or(7687);

        let username = match parsed.username() {
            "" => None,
            u => Some(u.to_string()),
        };
        let password = parsed.password().map(str::to_string);

        let database = parsed
            .path()
            .trim_start_matches('/')
            .to_string()
            .and_then_non_empty();

        let options: HashMap<String, String> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            family,
            host,
            port,
            username,
            password,
            database,
            secure,
            verify_cert,
            options,
        })
    }
}

trait EmptyAsNone {
    fn and_then_non_empty(self) -> Option<String>;
}

impl EmptyAsNone for String {
    fn and_then_non_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

fn scheme_parts(raw: &str, scheme: &str) -> Result<(Family, bool, bool)> {
    let (base, suffix) = match scheme.split_once('+') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (scheme, None),
    };
    let family = match base {
        "neo4j" => Family::Neo4j,
        "memgraph" => Family::Memgraph,
        other => return Err(Error::InvalidUrl(raw.to_string(), format!("unknown scheme '{other}'"))),
    };
    let (secure, verify_cert) = match suffix {
        None => (false, true),
        Some("ssl") => (true, true),
        Some("ssc") => (true, false),
        Some(other) => {
            return Err(Error::InvalidUrl(raw.to_string(), format!("unknown scheme suffix '+{other}'")))
        }
    };
    Ok((family, secure, verify_cert))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssc_is_secure_but_unverified() {
        let e = Endpoint::parse("memgraph+ssc://u:p@h:7687").unwrap();
        assert_eq!(e.family, Family::Memgraph);
        assert!(e.secure);
        assert!(!e.verify_cert);
        assert_eq!(e.username.as_deref(), Some("u"));
        assert_eq!(e.password.as_deref(), Some("p"));
        assert_eq!(e.host, "h");
        assert_eq!(e.port, 7687);
    }

    #[test]
    fn ssl_is_secure_and_verified() {
        let e = Endpoint::parse("memgraph+ssl://h").unwrap();
        assert!(e.secure);
        assert!(e.verify_cert);
    }

    #[test]
    fn plain_is_unsecured_but_reports_verify_true() {
        let e = Endpoint::parse("memgraph://h").unwrap();
        assert!(!e.secure);
        assert!(e.verify_cert);
    }

    #[test]
    fn database_and_options_parse() {
        let e = Endpoint::parse("neo4j://h:7687/mydb?timeout=5").unwrap();
        assert_eq!(e.family, Family::Neo4j);
        assert_eq!(e.database.as_deref(), Some("mydb"));
        assert_eq!(e.options.get("timeout").map(String::as_str), Some("5"));
    }

    #[test]
    fn unknown_scheme_rejected() {
        let err = Endpoint::parse("postgres://h").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_, _)));
    }
}
