use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::document::{CompoundDocument, Links, PrimaryData, ResourceIdentifier, SingleResource};
use crate::graph::DocumentGraph;
use crate::mapping::is_valid_member_name;

/// Errors returned when a [`CompoundDocument`] fails conformance validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("resource at {0} has an empty id")]
    EmptyId(String),

    #[error("resource at {0} has an empty type")]
    EmptyType(String),

    #[error("{pointer}: member name {name:?} is not a valid member name")]
    InvalidMemberName { pointer: String, name: String },

    #[error("{0} appears more than once across primary data and included resources")]
    DuplicateResource(ResourceIdentifier),

    #[error("included resource {0} is not reachable from primary data")]
    UnreachableResource(ResourceIdentifier),

    #[error("included resources are not allowed when primary data is absent")]
    IncludedWithoutData,

    #[error("error at index {index} has status {status}, expected 400..=599")]
    InvalidErrorStatus { index: usize, status: u16 },

    #[error("link {pointer} is not a valid URI: {href:?}")]
    InvalidLink { pointer: String, href: String },
}

/// Validate a [`CompoundDocument`] against the document rules.
///
/// Returns `Ok(())` if the document is conformant, or the first
/// [`ValidationError`] found. Checks run in document order: envelope, primary
/// data, included resources, then cross-resource rules (uniqueness and full
/// linkage).
pub fn validate_document(document: &CompoundDocument) -> Result<(), ValidationError> {
    validate_links("/links", &document.links)?;

    match &document.primary {
        PrimaryData::Errors(errors) => {
            for (index, error) in errors.iter().enumerate() {
                if !(400..=599).contains(&error.status) {
                    return Err(ValidationError::InvalidErrorStatus {
                        index,
                        status: error.status,
                    });
                }
            }
            if !document.included.is_empty() {
                return Err(ValidationError::IncludedWithoutData);
            }
            return Ok(());
        }
        PrimaryData::Null => {}
        PrimaryData::Single(resource) => validate_resource("/data", resource)?,
        PrimaryData::Collection(resources) => {
            for (i, resource) in resources.iter().enumerate() {
                validate_resource(&format!("/data/{i}"), resource)?;
            }
        }
    }

    for (i, resource) in document.included.iter().enumerate() {
        validate_resource(&format!("/included/{i}"), resource)?;
    }

    let mut seen = HashSet::new();
    for resource in document.primary_resources().into_iter().chain(&document.included) {
        let key = resource.identifier();
        if !seen.insert(key.clone()) {
            return Err(ValidationError::DuplicateResource(key));
        }
    }

    if let Some(orphan) = DocumentGraph::new(document).unreachable().first() {
        return Err(ValidationError::UnreachableResource(orphan.identifier()));
    }

    Ok(())
}

// --- helpers -----------------------------------------------------------------

fn validate_resource(pointer: &str, resource: &SingleResource) -> Result<(), ValidationError> {
    if resource.id.is_empty() {
        return Err(ValidationError::EmptyId(pointer.to_string()));
    }
    if resource.resource_type.is_empty() {
        return Err(ValidationError::EmptyType(pointer.to_string()));
    }

    let names = resource
        .attributes
        .keys()
        .map(|n| ("attributes", n))
        .chain(resource.relationships.keys().map(|n| ("relationships", n)));
    for (group, name) in names {
        if !is_valid_member_name(name) {
            return Err(ValidationError::InvalidMemberName {
                pointer: format!("{pointer}/{group}"),
                name: name.clone(),
            });
        }
    }

    validate_links(&format!("{pointer}/links"), &resource.links)
}

fn validate_links(pointer: &str, links: &Links) -> Result<(), ValidationError> {
    for (name, href) in links {
        if Url::parse(href).is_err() {
            return Err(ValidationError::InvalidLink {
                pointer: format!("{pointer}/{name}"),
                href: href.clone(),
            });
        }
    }
    Ok(())
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ErrorObject, Linkage, Relationship};
    use serde_json::json;

    fn person(id: &str) -> SingleResource {
        let mut links = Links::new();
        links.insert("self".into(), format!("http://example.com/people/{id}"));
        SingleResource {
            id: id.into(),
            resource_type: "people".into(),
            attributes: json!({ "name": "Dan" }).as_object().cloned().unwrap_or_default(),
            relationships: Default::default(),
            links,
        }
    }

    fn article(author: &str) -> SingleResource {
        let mut r = person("1");
        r.resource_type = "articles".into();
        r.relationships.insert(
            "author".into(),
            Relationship {
                data: Linkage::One(Some(ResourceIdentifier::new("people", author))),
            },
        );
        r
    }

    fn compound(included: Vec<SingleResource>) -> CompoundDocument {
        let mut doc = CompoundDocument::new(PrimaryData::Single(article("9")));
        doc.included = included;
        doc.links.insert("self".into(), "http://example.com/articles/1".into());
        doc
    }

    #[test]
    fn valid_compound_document() {
        assert_eq!(validate_document(&compound(vec![person("9")])), Ok(()));
    }

    #[test]
    fn valid_null_document() {
        assert_eq!(validate_document(&CompoundDocument::null()), Ok(()));
    }

    #[test]
    fn empty_id() {
        let mut doc = compound(vec![person("9")]);
        doc.included[0].id.clear();
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::EmptyId("/included/0".into()))
        );
    }

    #[test]
    fn empty_type() {
        let mut doc = compound(vec![]);
        if let PrimaryData::Single(r) = &mut doc.primary {
            r.resource_type.clear();
        }
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::EmptyType("/data".into()))
        );
    }

    #[test]
    fn invalid_attribute_name() {
        let mut doc = compound(vec![person("9")]);
        doc.included[0].attributes.insert("-bad".into(), json!(1));
        assert!(matches!(
            validate_document(&doc),
            Err(ValidationError::InvalidMemberName { ref name, .. }) if name == "-bad"
        ));
    }

    #[test]
    fn duplicate_included_resource() {
        let doc = compound(vec![person("9"), person("9")]);
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::DuplicateResource(ResourceIdentifier::new("people", "9")))
        );
    }

    #[test]
    fn primary_resource_repeated_in_included() {
        let doc = compound(vec![person("9"), article("9")]);
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::DuplicateResource(ResourceIdentifier::new("articles", "1")))
        );
    }

    #[test]
    fn orphaned_included_resource() {
        let doc = compound(vec![person("9"), person("10")]);
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::UnreachableResource(ResourceIdentifier::new("people", "10")))
        );
    }

    #[test]
    fn error_status_out_of_range() {
        let doc = CompoundDocument::errors(vec![
            ErrorObject::new(422, "Unprocessable Entity"),
            ErrorObject::new(200, "OK"),
        ])
        .unwrap();
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::InvalidErrorStatus { index: 1, status: 200 })
        );
    }

    #[test]
    fn relative_link_is_rejected() {
        let mut doc = compound(vec![person("9")]);
        doc.included[0].links.insert("self".into(), "/people/9".into());
        assert_eq!(
            validate_document(&doc),
            Err(ValidationError::InvalidLink {
                pointer: "/included/0/links/self".into(),
                href: "/people/9".into(),
            })
        );
    }
}
