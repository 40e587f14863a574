//! Error types for mapping configuration and document transformation.
//!
//! Two families exist, mirroring the two phases of a registry's life:
//!
//! - [`ConfigurationError`] is raised while mappings are declared and the
//!   registry is frozen. It is fatal at startup.
//! - [`TransformError`] is raised per operation by the transformers and is
//!   surfaced to the caller as a structured failure.

use thiserror::Error;

use crate::document::ErrorObject;

/// A mistake in the declared mappings, detected before any transform runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "{kind} name {name:?} is invalid; member names must be non-empty, \
         start and end with a letter or digit, and contain only letters, \
         digits, '-', '_' or ' '"
    )]
    InvalidMemberName { kind: &'static str, name: String },

    #[error("{0:?} is reserved and cannot be used as an attribute or relationship name")]
    ReservedMemberName(String),

    #[error("resource type {resource_type:?} declares the member {name:?} more than once")]
    DuplicateMember { resource_type: String, name: String },

    #[error("link template {template:?} is malformed: {reason}")]
    MalformedLinkTemplate { template: String, reason: String },

    #[error(
        "resource type {resource_type:?} is already registered for {existing}; \
         cannot register it again for {rejected}"
    )]
    DuplicateResourceType {
        resource_type: String,
        existing: &'static str,
        rejected: &'static str,
    },

    #[error(
        "relationship {relationship:?} on {resource_type:?} points at {target}, \
         which has no registered mapping"
    )]
    UnregisteredRelationshipTarget {
        resource_type: String,
        relationship: String,
        target: &'static str,
    },
}

/// The first requested include path that does not follow declared relationships.
///
/// Returned as a value, not raised: the transport layer decides which
/// response a bad `include` parameter deserves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("include path {path:?} names {segment:?}, which is not a declared relationship at that depth")]
pub struct InvalidIncludePath {
    pub path: String,
    pub segment: String,
}

impl From<&InvalidIncludePath> for ErrorObject {
    fn from(e: &InvalidIncludePath) -> Self {
        ErrorObject::new(400, "Bad Request")
            .with_code(codes::INVALID_INCLUDE)
            .with_detail(e.to_string())
            .with_source("include")
    }
}

/// A failure while transforming between an object graph and a document.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no mapping is registered for {type_name}")]
    MissingMapping { type_name: &'static str },

    #[error(
        "collection element {index} has type {type_name}, which has no mapping; \
         every element of a collection must be a mapped resource"
    )]
    UnsupportedElement { index: usize, type_name: &'static str },

    #[error("update document is typed {found:?} but the target maps to {expected:?}")]
    ResourceTypeMismatch { expected: String, found: String },

    #[error("mapping for {expected:?} was applied to a value of a different type")]
    MappingMismatch { expected: String },

    #[error("attribute {attribute:?} of {resource_type:?} could not be represented: {source}")]
    Serialization {
        resource_type: String,
        attribute: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("self link for {resource_type:?} {id:?} could not be built: {source}")]
    Link {
        resource_type: String,
        id: String,
        #[source]
        source: url::ParseError,
    },
}

impl TransformError {
    /// The HTTP status a transport layer should associate with this failure.
    ///
    /// Graph-shape and mapping problems are the caller's configuration
    /// mistakes (`422`); anything else is an internal failure (`500`).
    pub fn status(&self) -> u16 {
        match self {
            TransformError::MissingMapping { .. }
            | TransformError::UnsupportedElement { .. }
            | TransformError::ResourceTypeMismatch { .. } => 422,
            TransformError::MappingMismatch { .. }
            | TransformError::Serialization { .. }
            | TransformError::Link { .. } => 500,
        }
    }

    /// Machine-readable code used when this error is rendered as an [`ErrorObject`].
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::MissingMapping { .. } => codes::MISSING_MAPPING,
            TransformError::UnsupportedElement { .. } => codes::UNSUPPORTED_ELEMENT,
            TransformError::ResourceTypeMismatch { .. } => codes::TYPE_MISMATCH,
            TransformError::MappingMismatch { .. }
            | TransformError::Serialization { .. }
            | TransformError::Link { .. } => codes::INTERNAL_ERROR,
        }
    }
}

impl From<&TransformError> for ErrorObject {
    fn from(e: &TransformError) -> Self {
        ErrorObject {
            status: e.status(),
            code: Some(e.code().to_string()),
            title: Some(
                match e.status() {
                    422 => "Unprocessable Entity",
                    _ => "Internal Server Error",
                }
                .to_string(),
            ),
            detail: Some(e.to_string()),
            ..ErrorObject::default()
        }
    }
}

/// Well-known error codes placed in [`ErrorObject::code`].
pub mod codes {
    pub const MISSING_MAPPING: &str = "missing_mapping";
    pub const UNSUPPORTED_ELEMENT: &str = "unsupported_element";
    pub const TYPE_MISMATCH: &str = "type_mismatch";
    pub const INVALID_INCLUDE: &str = "invalid_include";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
