//! Parsed URL records handed to middleware as `ctx.location`

use crate::error::NavigationError;
use crate::params::QueryParams;
use url::Url;

// Stand-in origin for relative inputs when no base is configured. Never
// surfaces in a Location: relative locations report empty origin fields.
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// How raw URLs are turned into [`Location`]s
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Parse the query string into [`Location::query`]
    pub parse_query: bool,
    /// Hash routing prefix (always starts with `#`); `None` routes on the pathname
    pub hash_prefix: Option<String>,
    /// Base that relative inputs are resolved against
    pub base: Option<Url>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_query: true,
            hash_prefix: None,
            base: None,
        }
    }
}

/// A parsed URL, shaped like the browser's `Location`.
///
/// ```
/// use middle_router::{Location, ParseOptions};
///
/// let location = Location::parse(
///     "https://test.example:886/path?search=query&a=0&a=1#hash",
///     &ParseOptions::default(),
/// )
/// .unwrap();
///
/// assert_eq!(location.host, "test.example:886");
/// assert_eq!(location.pathname, "/path");
/// assert_eq!(location.query.get_all("a"), ["0", "1"]);
/// assert_eq!(location.hash, "#hash");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    /// Scheme with its trailing `:`, e.g. `https:`
    pub protocol: String,
    /// `hostname[:port]`
    pub host: String,
    pub hostname: String,
    /// Empty when the scheme's default port is used
    pub port: String,
    /// Always starts with `/`
    pub pathname: String,
    /// Query string with its leading `?`, or empty
    pub search: String,
    /// Fragment with its leading `#`, or empty
    pub hash: String,
    pub query: QueryParams,
}

impl Location {
    /// Parse `raw` (absolute URL or path) according to `options`.
    ///
    /// With hash routing the location describes the URL inside the hash:
    /// `/app#!/users?page=2` with prefix `#!` has pathname `/users`. Input
    /// without the prefix is taken to be the in-hash URL already.
    pub fn parse(raw: &str, options: &ParseOptions) -> Result<Self, NavigationError> {
        let invalid = |err: url::ParseError| NavigationError::InvalidUrl {
            url: raw.to_string(),
            message: err.to_string(),
        };

        let (mut url, absolute) = resolve(raw, options.base.as_ref()).map_err(invalid)?;

        if let Some(prefix) = &options.hash_prefix {
            if let Some(fragment) = url.fragment() {
                let hash = format!("#{}", fragment);
                let inner: String = hash.split(prefix.as_str()).skip(1).collect();
                let inner = if inner.is_empty() { "/".to_string() } else { inner };
                url = url.join(&inner).map_err(invalid)?;
            }
        }

        Ok(Self::from_url(&url, absolute, options.parse_query))
    }

    fn from_url(url: &Url, absolute: bool, parse_query: bool) -> Self {
        let pathname = if url.path().starts_with('/') {
            url.path().to_string()
        } else {
            format!("/{}", url.path())
        };
        let search = match url.query() {
            Some(q) if !q.is_empty() => format!("?{}", q),
            _ => String::new(),
        };
        let hash = match url.fragment() {
            Some(f) if !f.is_empty() => format!("#{}", f),
            _ => String::new(),
        };
        let query = if parse_query {
            QueryParams::parse(&search)
        } else {
            QueryParams::new()
        };

        if !absolute {
            return Self {
                href: format!("{}{}{}", pathname, search, hash),
                pathname,
                search,
                hash,
                query,
                ..Self::default()
            };
        }

        let hostname = url.host_str().unwrap_or_default().to_string();
        let port = url.port().map(|p| p.to_string()).unwrap_or_default();
        let host = if port.is_empty() {
            hostname.clone()
        } else {
            format!("{}:{}", hostname, port)
        };

        Self {
            href: url.as_str().to_string(),
            protocol: format!("{}:", url.scheme()),
            host,
            hostname,
            port,
            pathname,
            search,
            hash,
            query,
        }
    }

    /// Whether the location carries an origin (scheme and host)
    pub fn is_absolute(&self) -> bool {
        !self.protocol.is_empty()
    }
}

fn resolve(raw: &str, base: Option<&Url>) -> Result<(Url, bool), url::ParseError> {
    match Url::parse(raw) {
        Ok(url) => Ok((url, true)),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(raw).map(|url| (url, true)),
            None => Url::parse(RELATIVE_BASE)?.join(raw).map(|url| (url, false)),
        },
        Err(err) => Err(err),
    }
}
