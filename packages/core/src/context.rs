//! Per-operation transform context: base URI and requested include paths.

use url::Url;

/// Relationship paths a client asked to include, e.g. `comments.author`.
///
/// Paths are stored dot-delimited; `/` is accepted as an alternative
/// delimiter on input and normalized to `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePaths {
    paths: Vec<String>,
}

impl IncludePaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the value of an `include` query parameter.
    ///
    /// Entries are comma-separated and trimmed; empty entries are ignored and
    /// duplicates are dropped, keeping first-seen order.
    ///
    /// ```
    /// use graphdoc::IncludePaths;
    ///
    /// let paths = IncludePaths::parse("comments, comments/author,,comments");
    /// assert_eq!(paths.as_slice(), ["comments", "comments.author"]);
    /// ```
    pub fn parse(query: &str) -> Self {
        query.split(',').collect()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Whether a relationship at `path` should be walked.
    ///
    /// True when `path` was requested directly or is a segment prefix of a
    /// requested path (`comments` is walked when `comments.author` is asked
    /// for; `comment` is not).
    pub fn requests(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            p == path
                || p.strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn push(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let normalized = trimmed.replace('/', ".");
        if !self.paths.contains(&normalized) {
            self.paths.push(normalized);
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for IncludePaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut paths = Self::new();
        for raw in iter {
            paths.push(raw.as_ref());
        }
        paths
    }
}

/// The request-scoped input to a transform.
///
/// Immutable once constructed; create one per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    base_uri: Url,
    include: IncludePaths,
}

impl Context {
    pub fn new(base_uri: Url) -> Self {
        Self {
            base_uri,
            include: IncludePaths::new(),
        }
    }

    /// Parse `base_uri` as an absolute URI.
    pub fn parse(base_uri: &str) -> Result<Self, url::ParseError> {
        Url::parse(base_uri).map(Self::new)
    }

    pub fn with_include(mut self, include: IncludePaths) -> Self {
        self.include = include;
        self
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn include(&self) -> &IncludePaths {
        &self.include
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query() {
        let paths = IncludePaths::parse("comments,comments.author");
        assert_eq!(paths.as_slice(), ["comments", "comments.author"]);
        assert!(IncludePaths::parse("").is_empty());
        assert!(IncludePaths::parse(" , ").is_empty());
    }

    #[test]
    fn slash_is_normalized() {
        let paths = IncludePaths::parse("comments/author");
        assert_eq!(paths.as_slice(), ["comments.author"]);
    }

    #[test]
    fn requests_matches_prefixes_on_segment_boundaries() {
        let paths = IncludePaths::parse("comments.author.address");
        assert!(paths.requests("comments"));
        assert!(paths.requests("comments.author"));
        assert!(paths.requests("comments.author.address"));
        assert!(!paths.requests("comment"));
        assert!(!paths.requests("comments.auth"));
        assert!(!paths.requests("author"));
        assert!(!paths.requests("comments.author.address.city"));
    }

    #[test]
    fn context_keeps_base_uri() {
        let ctx = Context::parse("http://fakeUri:1234/fakecontroller")
            .unwrap()
            .with_include(IncludePaths::parse("author"));
        assert_eq!(ctx.base_uri().as_str(), "http://fakeuri:1234/fakecontroller");
        assert!(ctx.include().requests("author"));
    }
}
