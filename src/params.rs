//! Path parameters and query strings
//!
//! [`RouteParams`] holds the named captures collected while descending
//! through mounted routers. It is extended, never mutated, on the way down:
//! a nested router sees its ancestors' captures plus its own, while the
//! ancestors keep theirs untouched.
//!
//! [`QueryParams`] is the parsed query string of a location; repeated keys
//! keep every value in order.

use std::collections::HashMap;

/// Route parameters extracted from path segments
///
/// # Example
///
/// ```
/// use middle_router::RouteParams;
///
/// let outer = RouteParams::new().extended([("id".to_string(), "123".to_string())]);
/// let inner = outer.extended([("tab".to_string(), "posts".to_string())]);
///
/// assert_eq!(inner.get("id"), Some("123"));
/// assert_eq!(inner.get_as::<i32>("id"), Some(123));
/// assert!(!outer.contains("tab"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create new empty route params
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from hashmap
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Return a copy of these params overlaid with `captures`.
    ///
    /// A capture re-declaring an existing name replaces it in the copy only.
    pub fn extended<I>(&self, captures: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = self.params.clone();
        params.extend(captures);
        Self { params }
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from a URL query string
///
/// Keys and values are form-decoded (`%XX` and `+`). A key without `=` maps
/// to an empty value.
///
/// # Example
///
/// ```
/// use middle_router::QueryParams;
///
/// let query = QueryParams::parse("search=query&a=0&a=1&a=2");
///
/// assert_eq!(query.get("search"), Some("query"));
/// assert_eq!(query.get_all("a"), ["0", "1", "2"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create new empty query params
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without its leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
        params
    }

    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Every value for a key, in the order they appeared
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map_or(&[], Vec::as_slice)
    }

    /// Whether the key appeared more than once
    pub fn is_repeated(&self, key: &str) -> bool {
        self.get_all(key).len() > 1
    }

    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value; an existing key keeps its earlier values first.
    pub fn insert(&mut self, key: String, value: String) {
        self.params.entry(key).or_default().push(value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_extended_leaves_parent_untouched() {
        let parent = RouteParams::new().extended([pair("foo", "1")]);
        let child = parent.extended([pair("bar", "2")]);

        assert_eq!(child.get("foo"), Some("1"));
        assert_eq!(child.get("bar"), Some("2"));
        assert_eq!(parent.len(), 1);
        assert!(!parent.contains("bar"));
    }

    #[test]
    fn test_extended_redeclared_name_overrides_in_child_only() {
        let parent = RouteParams::new().extended([pair("id", "outer")]);
        let child = parent.extended([pair("id", "inner")]);

        assert_eq!(child.get("id"), Some("inner"));
        assert_eq!(parent.get("id"), Some("outer"));
    }

    #[test]
    fn test_route_params_get_as() {
        let params = RouteParams::new().extended([pair("id", "123"), pair("active", "true")]);

        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<bool>("active"), Some(true));
        assert_eq!(params.get_as::<i32>("active"), None);
        assert_eq!(params.get_as::<i32>("missing"), None);
    }

    #[test]
    fn test_query_repeated_keys_keep_order() {
        let query = QueryParams::parse("?search=query&a=0&a=1&a=2");

        assert_eq!(query.get("search"), Some("query"));
        assert_eq!(query.get_all("a"), ["0", "1", "2"]);
        assert!(query.is_repeated("a"));
        assert!(!query.is_repeated("search"));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_query_decoding() {
        let query = QueryParams::parse("q=hello+world&path=%2Fa%2Fb&eq=a=b&flag");

        assert_eq!(query.get("q"), Some("hello world"));
        assert_eq!(query.get("path"), Some("/a/b"));
        assert_eq!(query.get("eq"), Some("a=b"));
        assert_eq!(query.get("flag"), Some(""));
    }

    #[test]
    fn test_empty_query_string() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("?").is_empty());
        assert!(QueryParams::new().get_all("missing").is_empty());
    }
}
