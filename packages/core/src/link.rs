//! URL templating for resource self links.
//!
//! A mapping declares a template such as `/articles/{id}` or
//! `http://api.example.com/articles/{id}`. The `{id}` placeholder is replaced
//! with the percent-encoded resource id; relative templates are resolved
//! against the context's base URI.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::ConfigurationError;
use crate::mapping::ResourceMapping;

const ID_PLACEHOLDER: &str = "{id}";

/// Any `{...}` placeholder.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("invalid placeholder regex"));

/// A validated link template containing exactly one `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    template: String,
}

impl LinkTemplate {
    pub fn parse(template: impl Into<String>) -> Result<Self, ConfigurationError> {
        let template = template.into();
        let malformed = |reason: String| ConfigurationError::MalformedLinkTemplate {
            template: template.clone(),
            reason,
        };

        let placeholders: Vec<&str> = PLACEHOLDER_RE
            .find_iter(&template)
            .map(|m| m.as_str())
            .collect();
        if let Some(other) = placeholders.iter().find(|p| **p != ID_PLACEHOLDER) {
            return Err(malformed(format!("unknown placeholder {other}")));
        }
        match placeholders.len() {
            0 => return Err(malformed("missing the {id} placeholder".into())),
            1 => {}
            n => return Err(malformed(format!("{{id}} appears {n} times"))),
        }
        let stripped = PLACEHOLDER_RE.replace_all(&template, "");
        if stripped.contains('{') || stripped.contains('}') {
            return Err(malformed("unbalanced braces".into()));
        }

        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute `id` into the template and resolve the result against `base`.
    pub fn expand(&self, base: &Url, id: &str) -> Result<Url, url::ParseError> {
        let link = self
            .template
            .replace(ID_PLACEHOLDER, &urlencoding::encode(id));
        match Url::parse(&link) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(&link),
            Err(e) => Err(e),
        }
    }
}

/// Build the self link of the resource `id` described by `mapping`.
pub fn build_self_link(
    base_uri: &Url,
    mapping: &ResourceMapping,
    id: &str,
) -> Result<Url, url::ParseError> {
    mapping.link_template().expand(base_uri, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://fakeUri:1234/fakecontroller").unwrap()
    }

    #[test]
    fn absolute_template() {
        let t = LinkTemplate::parse("http://sampleClass/{id}").unwrap();
        assert_eq!(t.expand(&base(), "1").unwrap().as_str(), "http://sampleclass/1");
    }

    #[test]
    fn relative_template_resolves_against_base() {
        let t = LinkTemplate::parse("/articles/{id}").unwrap();
        assert_eq!(
            t.expand(&base(), "42").unwrap().as_str(),
            "http://fakeuri:1234/articles/42"
        );
    }

    #[test]
    fn id_is_percent_encoded() {
        let t = LinkTemplate::parse("/people/{id}").unwrap();
        assert_eq!(
            t.expand(&base(), "a b/c").unwrap().as_str(),
            "http://fakeuri:1234/people/a%20b%2Fc"
        );
    }

    #[test]
    fn missing_placeholder_rejected() {
        assert!(matches!(
            LinkTemplate::parse("/articles"),
            Err(ConfigurationError::MalformedLinkTemplate { .. })
        ));
    }

    #[test]
    fn unknown_or_repeated_placeholders_rejected() {
        assert!(LinkTemplate::parse("/articles/{slug}").is_err());
        assert!(LinkTemplate::parse("/articles/{id}/{id}").is_err());
        assert!(LinkTemplate::parse("/articles/{id}}").is_err());
    }
}
