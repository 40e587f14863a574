//! Wire-format types of the document envelope.
//!
//! This module defines the normalized structures produced by the forward
//! transform ([`CompoundDocument`], [`SingleResource`], [`ResourceCollection`])
//! and consumed by the backward transform ([`UpdateDocument`]). All types
//! serialise to and from JSON in the shape
//!
//! ```json
//! {
//!   "data": { "id": "1", "type": "articles", "attributes": { ... },
//!             "relationships": { "author": { "data": { "type": "people", "id": "9" } } },
//!             "links": { "self": "http://example.com/articles/1" } },
//!   "included": [ ... ],
//!   "links": { "self": "http://example.com/articles/1" }
//! }
//! ```
//!
//! `data` and `errors` are mutually exclusive; a document carries exactly one.

use std::ops::Deref;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Named links (`"self"`, `"related"`, ...) in insertion order.
pub type Links = IndexMap<String, String>;

/// A minimal `(type, id)` reference to a resource.
///
/// Also used as the de-duplication key of the included set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Formats as `type:id`.
impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

/// Resource linkage of a relationship.
///
/// A to-one relationship serialises as an identifier object or `null`; a
/// to-many relationship as an array (possibly empty).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

impl Linkage {
    /// All identifiers carried by this linkage, in order.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Linkage::Many(ids) => ids.iter().collect(),
            Linkage::One(id) => id.iter().collect(),
        }
    }
}

/// A relationship entry of a resource object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub data: Linkage,
}

/// The normalized representation of one domain object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SingleResource {
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    /// Attribute values in declaration order.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    /// Only relationships requested through the include paths are present.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, Relationship>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Links,
}

impl SingleResource {
    /// The `(type, id)` pair identifying this resource.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.resource_type, &self.id)
    }

    pub fn self_link(&self) -> Option<&str> {
        self.links.get("self").map(String::as_str)
    }
}

/// An ordered sequence of resources. Elements need not share a type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResourceCollection(pub Vec<SingleResource>);

impl Deref for ResourceCollection {
    type Target = [SingleResource];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<SingleResource> for ResourceCollection {
    fn from_iter<I: IntoIterator<Item = SingleResource>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One entry of an error document.
///
/// Only `status` is required; everything else is optional and omitted from
/// the wire when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Pointer to the offending part of the request (e.g. `/data/attributes/title`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ErrorObject {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            status,
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// The primary content of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    Null,
    Single(SingleResource),
    Collection(ResourceCollection),
    /// Never empty.
    Errors(Vec<ErrorObject>),
}

/// Errors returned when a document violates the envelope rules.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("a document must not contain both \"data\" and \"errors\"")]
    DataAndErrors,

    #[error("\"errors\" must contain at least one error object")]
    EmptyErrors,

    #[error("a document must contain either \"data\" or \"errors\"")]
    MissingPrimaryData,

    #[error("\"data\" is not a resource object, an array of resource objects, or null: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// The top-level envelope: primary data, included resources, links and meta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDocument")]
pub struct CompoundDocument {
    pub primary: PrimaryData,

    /// Related resources, unique by `(type, id)`, in discovery order.
    pub included: Vec<SingleResource>,

    pub links: Links,

    pub meta: Option<Map<String, Value>>,
}

impl CompoundDocument {
    pub fn new(primary: PrimaryData) -> Self {
        Self {
            primary,
            included: Vec::new(),
            links: Links::new(),
            meta: None,
        }
    }

    /// A document whose primary data is `null`.
    pub fn null() -> Self {
        Self::new(PrimaryData::Null)
    }

    /// An error document. Fails if `errors` is empty.
    pub fn errors(errors: Vec<ErrorObject>) -> Result<Self, DocumentError> {
        if errors.is_empty() {
            return Err(DocumentError::EmptyErrors);
        }
        Ok(Self::new(PrimaryData::Errors(errors)))
    }

    pub fn single(&self) -> Option<&SingleResource> {
        match &self.primary {
            PrimaryData::Single(r) => Some(r),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&ResourceCollection> {
        match &self.primary {
            PrimaryData::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn error_list(&self) -> Option<&[ErrorObject]> {
        match &self.primary {
            PrimaryData::Errors(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.primary, PrimaryData::Errors(_))
    }

    /// The HTTP status of an error document: the status of its first error.
    pub fn status(&self) -> Option<u16> {
        self.error_list().and_then(|e| e.first()).map(|e| e.status)
    }

    /// The primary resources, whether the data is a single resource or a collection.
    pub fn primary_resources(&self) -> Vec<&SingleResource> {
        match &self.primary {
            PrimaryData::Single(r) => vec![r],
            PrimaryData::Collection(c) => c.iter().collect(),
            PrimaryData::Null | PrimaryData::Errors(_) => vec![],
        }
    }
}

impl Serialize for CompoundDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.primary {
            PrimaryData::Null => map.serialize_entry("data", &Value::Null)?,
            PrimaryData::Single(r) => map.serialize_entry("data", r)?,
            PrimaryData::Collection(c) => map.serialize_entry("data", c)?,
            PrimaryData::Errors(e) => map.serialize_entry("errors", e)?,
        }
        if !self.included.is_empty() {
            map.serialize_entry("included", &self.included)?;
        }
        if !self.links.is_empty() {
            map.serialize_entry("links", &self.links)?;
        }
        if let Some(meta) = &self.meta {
            map.serialize_entry("meta", meta)?;
        }
        map.end()
    }
}

// Intermediate shape used to tell `"data": null` apart from an absent `data`.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<ErrorObject>>,
    #[serde(default)]
    included: Vec<SingleResource>,
    #[serde(default)]
    links: Links,
    #[serde(default)]
    meta: Option<Map<String, Value>>,
}

fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl TryFrom<RawDocument> for CompoundDocument {
    type Error = DocumentError;

    fn try_from(raw: RawDocument) -> Result<Self, Self::Error> {
        let primary = match (raw.data, raw.errors) {
            (Some(_), Some(_)) => return Err(DocumentError::DataAndErrors),
            (None, None) => return Err(DocumentError::MissingPrimaryData),
            (None, Some(errors)) if errors.is_empty() => return Err(DocumentError::EmptyErrors),
            (None, Some(errors)) => PrimaryData::Errors(errors),
            (Some(Value::Null), None) => PrimaryData::Null,
            (Some(data @ Value::Array(_)), None) => {
                PrimaryData::Collection(serde_json::from_value(data)?)
            }
            (Some(data), None) => PrimaryData::Single(serde_json::from_value(data)?),
        };
        Ok(Self {
            primary,
            included: raw.included,
            links: raw.links,
            meta: raw.meta,
        })
    }
}

// --- update documents --------------------------------------------------------

/// Presence of a field in a sparse payload.
///
/// `Present(Value::Null)` means "set to null"; `Absent` means "leave untouched".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Absent,
    Present(T),
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    pub fn present(self) -> Option<T> {
        match self {
            Field::Present(v) => Some(v),
            Field::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Absent, Field::Present)
    }
}

/// The sparse resource object of an [`UpdateDocument`].
///
/// Only the members present in the payload are applied by the backward
/// transform; everything else on the target is left as it was.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateResource {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, Relationship>,
}

impl UpdateResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, data: Linkage) -> Self {
        self.relationships.insert(name.into(), Relationship { data });
        self
    }

    pub fn attribute(&self, name: &str) -> Field<&Value> {
        self.attributes.get(name).into()
    }

    pub fn relationship(&self, name: &str) -> Field<&Linkage> {
        self.relationships.get(name).map(|r| &r.data).into()
    }
}

/// A partial update payload: `{ "data": { "type", "id"?, "attributes"?, "relationships"? } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateDocument {
    pub data: UpdateResource,
}

impl From<UpdateResource> for UpdateDocument {
    fn from(data: UpdateResource) -> Self {
        Self { data }
    }
}

// --- tests -------------------------------------------------------------------
