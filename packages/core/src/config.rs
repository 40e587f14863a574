//! Wire encoding settings, populated from environment variables.

use crate::document::CompoundDocument;

/// The registered media type of the document format.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// How documents are written to the wire.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `GRAPHDOC_PRETTY` | `false` | Indent JSON output |
/// | `GRAPHDOC_MEDIA_TYPE` | `application/vnd.api+json` | Content type advertised for documents |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Indent JSON output for humans.
    pub pretty: bool,

    /// Content type a transport layer should send with encoded documents.
    pub media_type: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pretty: false,
            media_type: MEDIA_TYPE.to_string(),
        }
    }
}

impl Settings {
    /// Populate settings from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Populate settings from an arbitrary variable source.
    ///
    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let pretty = lookup("GRAPHDOC_PRETTY")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.pretty);
        let media_type = lookup("GRAPHDOC_MEDIA_TYPE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.media_type);
        Self { pretty, media_type }
    }

    /// Serialize `document` as JSON text.
    pub fn encode(&self, document: &CompoundDocument) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// --- tests -------------------------------------------------------------------
