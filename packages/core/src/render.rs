//! Human-readable text rendering of resources and compound documents.
//!
//! The output is stable plain text suitable for terminals and logs. It is not
//! a canonical format; only the JSON wire format is normative.

use serde_json::Value;

use crate::document::{CompoundDocument, ErrorObject, Linkage, PrimaryData, SingleResource};
use crate::graph::DocumentGraph;

/// Render a single [`SingleResource`] as indented plain text.
///
/// ```text
/// [articles] 1  http://example.com/articles/1
///   title: "JSON API paints my bikeshed!"
///
///   author -> people:9
///   comments -> [comments:5, comments:12]
/// ```
pub fn render_resource(resource: &SingleResource) -> String {
    let mut out = format!("[{}] {}", resource.resource_type, resource.id);
    if let Some(link) = resource.self_link() {
        out.push_str(&format!("  {link}"));
    }
    out.push('\n');

    for (name, value) in &resource.attributes {
        out.push_str(&format!("  {name}: {}\n", truncate(&scalar(value), 72)));
    }

    if !resource.relationships.is_empty() {
        if !resource.attributes.is_empty() {
            out.push('\n');
        }
        for (name, relationship) in &resource.relationships {
            out.push_str(&format!("  {name} -> {}\n", linkage(&relationship.data)));
        }
    }

    out
}

/// Render a whole [`CompoundDocument`]: a summary header, primary data, then
/// included resources in document order.
///
/// ```text
/// Compound document  1 primary, 2 included
/// ────────────────────────────────────────
///
/// DATA
/// [articles] 1  http://example.com/articles/1
///   ...
///
/// INCLUDED (2)
/// [people] 9  http://example.com/people/9
///   ...
/// ```
pub fn render_document(document: &CompoundDocument) -> String {
    let header = match &document.primary {
        PrimaryData::Errors(errors) => format!("Error document  {} error{}", errors.len(), plural(errors.len())),
        _ => {
            let primary = document.primary_resources().len();
            format!(
                "Compound document  {primary} primary, {} included",
                document.included.len()
            )
        }
    };
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{header}\n{rule}\n");

    match &document.primary {
        PrimaryData::Errors(errors) => {
            out.push('\n');
            for error in errors {
                out.push_str(&render_error(error));
            }
        }
        PrimaryData::Null => out.push_str("\nDATA\n  null\n"),
        PrimaryData::Single(_) | PrimaryData::Collection(_) => {
            out.push_str("\nDATA\n");
            for resource in document.primary_resources() {
                out.push_str(&render_resource(resource));
            }
        }
    }

    if !document.included.is_empty() {
        out.push_str(&format!("\nINCLUDED ({})\n", document.included.len()));
        for resource in &document.included {
            out.push_str(&render_resource(resource));
        }
    }

    let dangling = DocumentGraph::new(document).dangling();
    if !dangling.is_empty() {
        let names: Vec<String> = dangling.iter().map(|k| k.to_string()).collect();
        out.push_str(&format!("\nNOT INCLUDED\n  {}\n", names.join(", ")));
    }

    if let Some(meta) = &document.meta {
        out.push_str("\nMETA\n");
        for (key, value) in meta {
            out.push_str(&format!("  {key}: {}\n", truncate(&scalar(value), 72)));
        }
    }

    out
}

// --- helpers -----------------------------------------------------------------

fn render_error(error: &ErrorObject) -> String {
    let mut out = format!("{}", error.status);
    if let Some(code) = &error.code {
        out.push_str(&format!(" {code}"));
    }
    if let Some(title) = &error.title {
        out.push_str(&format!("  {title}"));
    }
    out.push('\n');
    if let Some(detail) = &error.detail {
        out.push_str(&format!("  {detail}\n"));
    }
    if let Some(source) = &error.source {
        out.push_str(&format!("  at {source}\n"));
    }
    out
}

fn linkage(data: &Linkage) -> String {
    match data {
        Linkage::One(None) => "null".to_string(),
        Linkage::One(Some(identifier)) => identifier.to_string(),
        Linkage::Many(identifiers) => {
            let items: Vec<String> = identifiers.iter().map(|i| i.to_string()).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Links, Relationship, ResourceIdentifier};
    use serde_json::json;

    fn article() -> SingleResource {
        let mut links = Links::new();
        links.insert("self".into(), "http://example.com/articles/1".into());
        let mut r = SingleResource {
            id: "1".into(),
            resource_type: "articles".into(),
            attributes: json!({ "title": "Rails is Omakase" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            relationships: Default::default(),
            links,
        };
        r.relationships.insert(
            "author".into(),
            Relationship {
                data: Linkage::One(Some(ResourceIdentifier::new("people", "9"))),
            },
        );
        r.relationships.insert(
            "comments".into(),
            Relationship {
                data: Linkage::Many(vec![
                    ResourceIdentifier::new("comments", "5"),
                    ResourceIdentifier::new("comments", "12"),
                ]),
            },
        );
        r
    }

    #[test]
    fn render_resource_contains_key_fields() {
        let rendered = render_resource(&article());
        assert!(rendered.starts_with("[articles] 1  http://example.com/articles/1\n"));
        assert!(rendered.contains("  title: \"Rails is Omakase\"\n"));
        assert!(rendered.contains("  author -> people:9\n"));
        assert!(rendered.contains("  comments -> [comments:5, comments:12]\n"));
    }

    #[test]
    fn render_document_lists_missing_linkage_targets() {
        let doc = CompoundDocument::new(PrimaryData::Single(article()));
        let rendered = render_document(&doc);
        assert!(rendered.contains("1 primary, 0 included"));
        assert!(rendered.contains("NOT INCLUDED\n  people:9, comments:5, comments:12"));
    }

    #[test]
    fn render_error_document() {
        let doc = CompoundDocument::errors(vec![ErrorObject::new(422, "Unprocessable Entity")
            .with_code("type_mismatch")
            .with_detail("expected \"articles\"")])
        .unwrap();
        let rendered = render_document(&doc);
        assert!(rendered.contains("1 error\n"));
        assert!(rendered.contains("422 type_mismatch  Unprocessable Entity"));
    }

    #[test]
    fn long_values_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
