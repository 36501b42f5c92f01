//! Path pattern compilation and matching
//!
//! Patterns are made of `/`-separated segments:
//!
//! - `users` - literal, compared ASCII case-insensitively
//! - `:id` - named parameter, never matches an empty segment
//! - `:id?` - optional named parameter
//! - `:id<\d+>` / `:id<uuid>` - constrained parameter
//! - `*` - matches the rest of the path
//!
//! A matcher compiled as a *mount point* matches its pattern as a prefix and
//! reports everything after it as the remainder, so `/a` matches `/a`, `/a/`
//! and `/a/b` with remainders `/`, `/` and `/b`.
//!
//! Paths are percent-decoded before matching. A path that does not decode to
//! UTF-8 simply does not match.

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, MatchCache};
use crate::{trace_log, warn_log};
use std::collections::HashSet;

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Named captures in pattern order
    pub params: Vec<(String, String)>,
    /// Path left for the mounted router; `None` unless compiled as a mount point
    pub remainder: Option<String>,
}

/// A compiled path pattern
#[derive(Debug)]
pub struct PathMatcher {
    pattern: String,
    segments: Vec<Segment>,
    mount: bool,
    #[cfg(feature = "cache")]
    cache: MatchCache,
}

impl PathMatcher {
    /// Compile `pattern`. With `mount` set the pattern matches as a prefix.
    ///
    /// ```
    /// use middle_router::PathMatcher;
    ///
    /// let matcher = PathMatcher::compile("/foo/:bar", false);
    /// let found = matcher.test("/foo/xyz").unwrap();
    /// assert_eq!(found.params, vec![("bar".to_string(), "xyz".to_string())]);
    ///
    /// let mount = PathMatcher::compile("/a", true);
    /// assert_eq!(mount.test("/a").unwrap().remainder.as_deref(), Some("/"));
    /// assert_eq!(mount.test("/a/b").unwrap().remainder.as_deref(), Some("/b"));
    /// ```
    pub fn compile(pattern: &str, mount: bool) -> Self {
        let segments: Vec<Segment> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();

        let mut seen = HashSet::new();
        for segment in &segments {
            if let Segment::Param { name, .. } = segment {
                if !seen.insert(name.as_str()) {
                    warn_log!(
                        "pattern '{}' declares parameter '{}' more than once; the last capture wins",
                        pattern,
                        name
                    );
                }
            }
        }

        trace_log!("compiled pattern '{}' (mount: {})", pattern, mount);

        Self {
            pattern: pattern.to_string(),
            segments,
            mount,
            #[cfg(feature = "cache")]
            cache: MatchCache::new(),
        }
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this matcher was compiled as a mount point
    pub fn is_mount(&self) -> bool {
        self.mount
    }

    /// Test `path` against the pattern.
    pub fn test(&self, path: &str) -> Option<PathMatch> {
        #[cfg(feature = "cache")]
        let cached = self.cache.get(path);
        #[cfg(not(feature = "cache"))]
        let cached: Option<Option<PathMatch>> = None;

        if let Some(outcome) = cached {
            return outcome;
        }

        let outcome = match urlencoding::decode(path) {
            Ok(decoded) => self.match_decoded(&decoded),
            Err(err) => {
                warn_log!("cannot decode path '{}': {}; treating as no match", path, err);
                None
            }
        };

        #[cfg(feature = "cache")]
        self.cache.insert(path.to_string(), outcome.clone());

        outcome
    }

    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn match_decoded(&self, path: &str) -> Option<PathMatch> {
        let pieces = segment_spans(path);
        let mut consumed = 0;
        let mut params = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Static(expected) => {
                    let &(start, end) = pieces.get(consumed)?;
                    if !path[start..end].eq_ignore_ascii_case(expected) {
                        return None;
                    }
                    consumed += 1;
                }
                Segment::Param {
                    name,
                    constraint,
                    optional,
                } => match pieces.get(consumed) {
                    Some(&(start, end))
                        if start < end
                            && constraint.map_or(true, |c| c.validate(&path[start..end])) =>
                    {
                        params.push((name.clone(), path[start..end].to_string()));
                        consumed += 1;
                    }
                    _ if *optional => {}
                    _ => return None,
                },
                Segment::Wildcard => {
                    consumed = pieces.len();
                    break;
                }
            }
        }

        if self.mount {
            let rest_start = consumed.checked_sub(1).map_or(0, |last| pieces[last].1);
            let rest = path[rest_start..].trim_start_matches('/');
            return Some(PathMatch {
                params,
                remainder: Some(format!("/{}", rest)),
            });
        }

        (consumed == pieces.len()).then_some(PathMatch {
            params,
            remainder: None,
        })
    }
}

/// Byte ranges of the segments of `path`, ignoring one leading and one
/// trailing slash. Interior empty segments (`/a//b`) are kept as empty
/// ranges so they never match a literal or a parameter.
fn segment_spans(path: &str) -> Vec<(usize, usize)> {
    let start = usize::from(path.starts_with('/'));
    let end = match path.strip_suffix('/') {
        Some(trimmed) if trimmed.len() > start => trimmed.len(),
        _ => path.len(),
    };
    if start >= end {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut from = start;
    for (i, ch) in path[start..end].char_indices() {
        if ch == '/' {
            spans.push((from, start + i));
            from = start + i + 1;
        }
    }
    spans.push((from, end));
    spans
}

/// A single segment in a route pattern
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Static(String),
    Param {
        name: String,
        constraint: Option<Constraint>,
        optional: bool,
    },
    Wildcard,
}

impl Segment {
    fn parse(s: &str) -> Self {
        if s == "*" {
            return Segment::Wildcard;
        }

        let Some(rest) = s.strip_prefix(':') else {
            return Segment::Static(s.to_string());
        };

        let (rest, optional) = match rest.strip_suffix('?') {
            Some(rest) => (rest, true),
            None => (rest, false),
        };

        // :id<\d+>
        let (name, constraint) = match rest.find('<') {
            Some(pos) if rest.ends_with('>') => {
                let spec = &rest[pos + 1..rest.len() - 1];
                let constraint = Constraint::parse(spec);
                if constraint.is_none() {
                    warn_log!("unknown constraint '<{}>' on parameter ignored", spec);
                }
                (&rest[..pos], constraint)
            }
            _ => (rest, None),
        };

        Segment::Param {
            name: name.to_string(),
            constraint,
            optional,
        }
    }
}

/// Constraint for validating parameter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Numeric,
    Uuid,
}

impl Constraint {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "\\d+" | "number" => Some(Constraint::Numeric),
            "uuid" => Some(Constraint::Uuid),
            _ => None,
        }
    }

    fn validate(self, value: &str) -> bool {
        match self {
            Constraint::Numeric => value.chars().all(|c| c.is_ascii_digit()),
            Constraint::Uuid => {
                let parts: Vec<&str> = value.split('-').collect();
                parts.len() == 5
                    && [8, 4, 4, 4, 12]
                        .iter()
                        .zip(&parts)
                        .all(|(len, part)| part.len() == *len)
                    && parts
                        .iter()
                        .all(|p| p.chars().all(|c| c.is_ascii_hexdigit()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(found: &PathMatch) -> Vec<(&str, &str)> {
        found
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_segment_parsing() {
        assert_eq!(Segment::parse("users"), Segment::Static("users".to_string()));
        assert_eq!(
            Segment::parse(":id?"),
            Segment::Param {
                name: "id".to_string(),
                constraint: None,
                optional: true
            }
        );
        assert_eq!(
            Segment::parse(":id<\\d+>"),
            Segment::Param {
                name: "id".to_string(),
                constraint: Some(Constraint::Numeric),
                optional: false
            }
        );
        assert_eq!(Segment::parse("*"), Segment::Wildcard);
    }

    #[test]
    fn test_named_params() {
        let matcher = PathMatcher::compile("/api/users/:userId/posts/:postId", false);
        let found = matcher.test("/api/users/42/posts/7").unwrap();
        assert_eq!(params(&found), vec![("userId", "42"), ("postId", "7")]);
        assert_eq!(found.remainder, None);
    }

    #[test]
    fn test_exact_match_allows_trailing_slash_only() {
        let matcher = PathMatcher::compile("/foo/:bar", false);
        assert!(matcher.test("/foo/xyz/").is_some());
        assert!(matcher.test("/foo").is_none());
        assert!(matcher.test("/foo/xyz/more").is_none());
        assert!(matcher.test("/bar/xyz").is_none());
    }

    #[test]
    fn test_empty_interior_segment_never_matches() {
        let matcher = PathMatcher::compile("/a/:b", false);
        assert!(matcher.test("/a//x").is_none());
        assert!(matcher.test("/a//").is_none());
        assert!(matcher.test("/a/x/").is_some());

        let literal = PathMatcher::compile("/a/b", false);
        assert!(literal.test("/a//b").is_none());

        let optional = PathMatcher::compile("/a/:b?", false);
        assert!(optional.test("/a/").is_some());
        assert!(optional.test("/a//").is_none());

        let mount = PathMatcher::compile("/a", true);
        assert_eq!(mount.test("/a//x").unwrap().remainder.as_deref(), Some("/x"));
    }

    #[test]
    fn test_literals_ignore_ascii_case() {
        let matcher = PathMatcher::compile("/Users", false);
        assert!(matcher.test("/users").is_some());
    }

    #[test]
    fn test_mount_remainder_is_trailing_slash_insensitive() {
        let matcher = PathMatcher::compile("/a", true);
        assert_eq!(matcher.test("/a").unwrap().remainder.as_deref(), Some("/"));
        assert_eq!(matcher.test("/a/").unwrap().remainder.as_deref(), Some("/"));
        assert_eq!(matcher.test("/a/b").unwrap().remainder.as_deref(), Some("/b"));
        assert_eq!(
            matcher.test("/a/b/c/").unwrap().remainder.as_deref(),
            Some("/b/c/")
        );
        assert!(matcher.test("/ab").is_none());
    }

    #[test]
    fn test_mount_with_param_and_trailing_slash_in_pattern() {
        let matcher = PathMatcher::compile("/:foo/", true);
        let found = matcher.test("/foo/bar/bar").unwrap();
        assert_eq!(params(&found), vec![("foo", "foo")]);
        assert_eq!(found.remainder.as_deref(), Some("/bar/bar"));
    }

    #[test]
    fn test_root_mount_passes_whole_path() {
        let matcher = PathMatcher::compile("/", true);
        assert_eq!(
            matcher.test("/x/y").unwrap().remainder.as_deref(),
            Some("/x/y")
        );
    }

    #[test]
    fn test_root_exact() {
        let matcher = PathMatcher::compile("/", false);
        assert!(matcher.test("/").is_some());
        assert!(matcher.test("/foo").is_none());
    }

    #[test]
    fn test_wildcard() {
        let matcher = PathMatcher::compile("/files/*", false);
        assert!(matcher.test("/files/docs/report.pdf").is_some());
        assert!(matcher.test("/files").is_some());
        assert!(matcher.test("/other").is_none());
    }

    #[test]
    fn test_optional_param() {
        let matcher = PathMatcher::compile("/posts/:id?", false);
        assert_eq!(params(&matcher.test("/posts/9").unwrap()), vec![("id", "9")]);
        assert!(matcher.test("/posts").unwrap().params.is_empty());
    }

    #[test]
    fn test_constraints() {
        let numeric = PathMatcher::compile("/users/:id<\\d+>", false);
        assert!(numeric.test("/users/123").is_some());
        assert!(numeric.test("/users/abc").is_none());

        let uuid = PathMatcher::compile("/items/:id<uuid>", false);
        assert!(uuid.test("/items/550e8400-e29b-41d4-a716-446655440000").is_some());
        assert!(uuid.test("/items/550e8400-e29b-41d4").is_none());
    }

    #[test]
    fn test_percent_decoding() {
        let matcher = PathMatcher::compile("/tags/:tag", false);
        let found = matcher.test("/tags/rust%20lang").unwrap();
        assert_eq!(params(&found), vec![("tag", "rust lang")]);
    }

    #[test]
    fn test_undecodable_path_is_no_match() {
        let matcher = PathMatcher::compile("/tags/:tag", false);
        assert!(matcher.test("/tags/%FF%FE").is_none());
    }

    #[test]
    fn test_duplicate_param_last_wins_in_params() {
        let matcher = PathMatcher::compile("/:id/:id", false);
        let found = matcher.test("/a/b").unwrap();
        let merged = crate::RouteParams::new().extended(found.params);
        assert_eq!(merged.get("id"), Some("b"));
    }

    #[cfg(feature = "cache")]
    #[test]
    fn test_repeated_tests_hit_the_cache() {
        let matcher = PathMatcher::compile("/foo/:bar", false);
        matcher.test("/foo/1");
        matcher.test("/foo/1");
        matcher.test("/nope");
        let stats = matcher.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }
}
