//! Origin normalization and allowed-origin policies.

use std::fmt;

use url::Url;

/// Tenant setting key holding the raw allowed-origins value.
pub const CORS_ALLOWED_ORIGINS_KEY: &str = "http.cors.allowedOrigins";

/// Normalize an origin to `scheme://host[:port]`.
///
/// - Empty strings and `*` are returned unchanged (after trimming).
/// - Parseable URLs with a host reduce to scheme, host and non-default port.
/// - Anything else has trailing slashes and whitespace stripped.
///
/// Normalization is idempotent.
pub fn normalize_origin(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return trimmed.to_string();
    }

    if let Ok(url) = Url::parse(trimmed) {
        if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
            return match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            };
        }
    }

    trimmed
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Origins a tenant accepts cross-origin requests from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin is accepted
    Any,
    /// Only these normalized origins are accepted (deduplicated, in order)
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse a raw setting value.
    ///
    /// Entries are separated by newlines or commas. A missing or empty value,
    /// an entry of `*`, or a value with no usable entries yields
    /// [`AllowedOrigins::Any`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
            return AllowedOrigins::Any;
        };

        let mut entries: Vec<String> = Vec::new();
        for entry in raw.split(['\n', ',']).map(normalize_origin) {
            if entry.is_empty() {
                continue;
            }
            if entry == "*" {
                return AllowedOrigins::Any;
            }
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(entries)
        }
    }

    /// Whether an already-normalized origin is accepted.
    pub fn allows(&self, normalized: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(origins) => origins.iter().any(|o| o == normalized),
        }
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedOrigins::Any => write!(f, "*"),
            AllowedOrigins::List(origins) => write!(f, "[{}]", origins.join(", ")),
        }
    }
}
