//! Per-type mapping declarations.
//!
//! A [`ResourceMapping`] describes how one Rust type becomes a resource: the
//! resource-type name, an id accessor, named attribute accessors, named
//! relationship accessors and a self-link template. Mappings are declared
//! with typed closures through [`MappingBuilder`] and erased to `&dyn Any`
//! accessors so the registry can hold mappings for many types side by side.
//!
//! ```rust,ignore
//! let articles = ResourceMapping::builder("articles", |a: &Article| a.id)
//!     .link_template("/articles/{id}")
//!     .attribute_rw("title", |a| a.title.clone(), |a, v| a.title = v)
//!     .has_one("author", |a| a.author.as_ref())
//!     .has_many("comments", |a| a.comments.iter().collect())
//!     .build()?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::{collection_type_ids, Entity};
use crate::error::{ConfigurationError, InvalidIncludePath, TransformError};
use crate::link::LinkTemplate;
use crate::registry::Registry;

/// Names that collide with the members of a resource object.
const RESERVED_NAMES: [&str; 4] = ["id", "type", "links", "href"];

/// Member names: letters, digits, `-`, `_`, space; alphanumeric at both ends.
/// `.`, `/` and `,` are excluded because they delimit include paths.
static MEMBER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9_\- ]*[A-Za-z0-9])?$").expect("invalid member name regex")
});

type IdFn = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type GetFn = Box<dyn Fn(&dyn Any) -> Option<Result<Value, serde_json::Error>> + Send + Sync>;
type SetFn = Box<dyn Fn(&mut dyn Any, Value) -> Result<(), SetError> + Send + Sync>;
type RelatedFn = Box<dyn for<'a> Fn(&'a dyn Any) -> Option<Related<'a>> + Send + Sync>;
type LinkFn = Box<dyn Fn(&mut dyn Any, Resolved) -> Result<(), SetError> + Send + Sync>;

/// Whether a relationship points at one related object or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// The related value(s) read from an object through a relationship accessor.
pub enum Related<'a> {
    One(Option<&'a dyn Entity>),
    Many(Vec<&'a dyn Entity>),
}

/// Related instances produced by a linkage resolver, handed to a relationship setter.
pub enum Resolved {
    One(Option<Box<dyn Any>>),
    Many(Vec<Box<dyn Any>>),
}

/// Why an erased setter refused its input.
#[derive(Debug)]
pub(crate) enum SetError {
    /// The setter was invoked on an object of another type.
    Target,
    /// A resolved related instance was not of the declared related type.
    RelatedType { expected: &'static str },
    Cardinality,
    Coercion(serde_json::Error),
}

/// A named attribute: a getter, and optionally a setter for sparse updates.
pub struct AttributeMapping {
    name: String,
    get: GetFn,
    set: Option<SetFn>,
}

impl AttributeMapping {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub(crate) fn get(&self, obj: &dyn Any) -> Option<Result<Value, serde_json::Error>> {
        (self.get)(obj)
    }

    /// `None` when the attribute is read-only.
    pub(crate) fn set(&self, obj: &mut dyn Any, value: Value) -> Option<Result<(), SetError>> {
        self.set.as_ref().map(|set| set(obj, value))
    }
}

/// A named relationship to another mapped type.
pub struct RelationshipMapping {
    name: String,
    cardinality: Cardinality,
    target: TypeId,
    target_name: &'static str,
    get: RelatedFn,
    set: Option<LinkFn>,
}

impl RelationshipMapping {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Runtime type of the related objects.
    pub fn target(&self) -> TypeId {
        self.target
    }

    pub fn target_name(&self) -> &'static str {
        self.target_name
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub(crate) fn related<'a>(&self, obj: &'a dyn Any) -> Option<Related<'a>> {
        (self.get)(obj)
    }

    /// `None` when the relationship is read-only.
    pub(crate) fn set(&self, obj: &mut dyn Any, resolved: Resolved) -> Option<Result<(), SetError>> {
        self.set.as_ref().map(|set| set(obj, resolved))
    }
}

/// How one runtime type is represented as a resource.
pub struct ResourceMapping {
    resource_type: String,
    type_id: TypeId,
    collection_types: [TypeId; 5],
    type_name: &'static str,
    link_template: LinkTemplate,
    id: IdFn,
    attributes: Vec<AttributeMapping>,
    relationships: Vec<RelationshipMapping>,
}

impl std::fmt::Debug for ResourceMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMapping")
            .field("resource_type", &self.resource_type)
            .field("type_name", &self.type_name)
            .field("link_template", &self.link_template.as_str())
            .field(
                "attributes",
                &self.attributes.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field(
                "relationships",
                &self.relationships.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ResourceMapping {
    /// Start declaring the mapping of `T` under `resource_type`.
    ///
    /// `id` reads the identifier; it is stringified with `Display`.
    pub fn builder<T, I, F>(resource_type: impl Into<String>, id: F) -> MappingBuilder<T>
    where
        T: Any,
        I: Display,
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        MappingBuilder {
            resource_type: resource_type.into(),
            id: Box::new(move |obj: &dyn Any| obj.downcast_ref::<T>().map(|t| id(t).to_string())),
            link_template: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn represented_type(&self) -> TypeId {
        self.type_id
    }

    /// Runtime types of the standard collections of the represented type.
    pub fn collection_types(&self) -> &[TypeId] {
        &self.collection_types
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn link_template(&self) -> &LinkTemplate {
        &self.link_template
    }

    /// Attribute accessors in declaration order.
    pub fn attributes(&self) -> &[AttributeMapping] {
        &self.attributes
    }

    /// Relationship accessors in declaration order.
    pub fn relationships(&self) -> &[RelationshipMapping] {
        &self.relationships
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMapping> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipMapping> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub(crate) fn id_of(&self, obj: &dyn Any) -> Result<String, TransformError> {
        (self.id)(obj).ok_or_else(|| self.mismatch())
    }

    /// Every declared attribute of `obj`, in declaration order.
    pub(crate) fn attributes_of(&self, obj: &dyn Any) -> Result<Map<String, Value>, TransformError> {
        let mut out = Map::new();
        for attribute in &self.attributes {
            let value = attribute
                .get(obj)
                .ok_or_else(|| self.mismatch())?
                .map_err(|source| TransformError::Serialization {
                    resource_type: self.resource_type.clone(),
                    attribute: attribute.name.clone(),
                    source,
                })?;
            out.insert(attribute.name.clone(), value);
        }
        Ok(out)
    }

    pub(crate) fn mismatch(&self) -> TransformError {
        TransformError::MappingMismatch {
            expected: self.resource_type.clone(),
        }
    }

    /// Whether every requested path follows declared relationships.
    ///
    /// Each dot-delimited segment must name a relationship of the mapping
    /// reached so far; the walk continues into the related type's mapping.
    pub fn validate_included_relationship_paths<S: AsRef<str>>(
        &self,
        paths: &[S],
        registry: &Registry,
    ) -> bool {
        self.find_invalid_include_path(paths, registry).is_none()
    }

    /// The first path (and segment) that does not follow declared relationships.
    pub fn find_invalid_include_path<S: AsRef<str>>(
        &self,
        paths: &[S],
        registry: &Registry,
    ) -> Option<InvalidIncludePath> {
        paths.iter().find_map(|path| {
            let path = path.as_ref();
            let invalid = |segment: &str| InvalidIncludePath {
                path: path.to_string(),
                segment: segment.to_string(),
            };
            let mut mapping = self;
            for segment in path.split(['.', '/']) {
                let Some(relationship) = mapping.relationship(segment) else {
                    return Some(invalid(segment));
                };
                match registry.resolve_type_id(relationship.target) {
                    Some(next) => mapping = next,
                    None => return Some(invalid(segment)),
                }
            }
            None
        })
    }
}

/// Typed declaration of a [`ResourceMapping`] for `T`.
///
/// Declaration errors are collected and reported by [`build`](Self::build).
pub struct MappingBuilder<T> {
    resource_type: String,
    id: IdFn,
    link_template: Option<String>,
    attributes: Vec<AttributeMapping>,
    relationships: Vec<RelationshipMapping>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Any> MappingBuilder<T> {
    /// The self-link template; must contain exactly one `{id}` placeholder.
    pub fn link_template(mut self, template: impl Into<String>) -> Self {
        self.link_template = Some(template.into());
        self
    }

    /// A read-only attribute.
    pub fn attribute<V, G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        V: Serialize,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            get: getter::<T, V, G>(get),
            set: None,
        });
        self
    }

    /// An attribute that sparse updates may write.
    ///
    /// Incoming values are coerced into `V` with `serde_json::from_value`.
    pub fn attribute_rw<V, G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        V: Serialize + DeserializeOwned,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.attributes.push(AttributeMapping {
            name: name.into(),
            get: getter::<T, V, G>(get),
            set: Some(Box::new(move |obj: &mut dyn Any, value: Value| {
                let target = obj.downcast_mut::<T>().ok_or(SetError::Target)?;
                let value = serde_json::from_value::<V>(value).map_err(SetError::Coercion)?;
                set(target, value);
                Ok(())
            })),
        });
        self
    }

    /// A read-only to-one relationship.
    pub fn has_one<R, G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        self.relationships.push(Self::to_one::<R, G>(name.into(), get, None));
        self
    }

    /// A to-one relationship that sparse updates may relink.
    pub fn has_one_rw<R, G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
        S: Fn(&mut T, Option<R>) + Send + Sync + 'static,
    {
        let link: LinkFn = Box::new(move |obj: &mut dyn Any, resolved: Resolved| {
            let target = obj.downcast_mut::<T>().ok_or(SetError::Target)?;
            match resolved {
                Resolved::One(None) => set(target, None),
                Resolved::One(Some(related)) => set(target, Some(downcast_related::<R>(related)?)),
                Resolved::Many(_) => return Err(SetError::Cardinality),
            }
            Ok(())
        });
        self.relationships.push(Self::to_one::<R, G>(name.into(), get, Some(link)));
        self
    }

    /// A read-only to-many relationship.
    pub fn has_many<R, G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Vec<&'a R> + Send + Sync + 'static,
    {
        self.relationships.push(Self::to_many::<R, G>(name.into(), get, None));
        self
    }

    /// A to-many relationship that sparse updates may replace.
    ///
    /// The setter receives the complete new set of related instances.
    pub fn has_many_rw<R, G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Vec<&'a R> + Send + Sync + 'static,
        S: Fn(&mut T, Vec<R>) + Send + Sync + 'static,
    {
        let link: LinkFn = Box::new(move |obj: &mut dyn Any, resolved: Resolved| {
            let target = obj.downcast_mut::<T>().ok_or(SetError::Target)?;
            let Resolved::Many(items) = resolved else {
                return Err(SetError::Cardinality);
            };
            let related = items
                .into_iter()
                .map(downcast_related::<R>)
                .collect::<Result<Vec<R>, _>>()?;
            set(target, related);
            Ok(())
        });
        self.relationships.push(Self::to_many::<R, G>(name.into(), get, Some(link)));
        self
    }

    /// Validate the declaration and produce the mapping.
    pub fn build(self) -> Result<ResourceMapping, ConfigurationError> {
        check_member_name("resource type", &self.resource_type)?;

        let mut seen: Vec<&str> = Vec::new();
        let names = self
            .attributes
            .iter()
            .map(|a| ("attribute", a.name.as_str()))
            .chain(self.relationships.iter().map(|r| ("relationship", r.name.as_str())));
        for (kind, name) in names {
            check_member_name(kind, name)?;
            if RESERVED_NAMES.contains(&name) {
                return Err(ConfigurationError::ReservedMemberName(name.to_string()));
            }
            if seen.contains(&name) {
                return Err(ConfigurationError::DuplicateMember {
                    resource_type: self.resource_type.clone(),
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }

        let link_template = match self.link_template {
            Some(template) => LinkTemplate::parse(template)?,
            None => {
                return Err(ConfigurationError::MalformedLinkTemplate {
                    template: String::new(),
                    reason: format!("no link template declared for {:?}", self.resource_type),
                })
            }
        };

        Ok(ResourceMapping {
            resource_type: self.resource_type,
            type_id: TypeId::of::<T>(),
            collection_types: collection_type_ids::<T>(),
            type_name: type_name::<T>(),
            link_template,
            id: self.id,
            attributes: self.attributes,
            relationships: self.relationships,
        })
    }

    fn to_one<R, G>(name: String, get: G, set: Option<LinkFn>) -> RelationshipMapping
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
    {
        RelationshipMapping {
            name,
            cardinality: Cardinality::ToOne,
            target: TypeId::of::<R>(),
            target_name: type_name::<R>(),
            get: related_fn(move |obj| {
                obj.downcast_ref::<T>()
                    .map(|t| Related::One(get(t).map(|r| r as &dyn Entity)))
            }),
            set,
        }
    }

    fn to_many<R, G>(name: String, get: G, set: Option<LinkFn>) -> RelationshipMapping
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Vec<&'a R> + Send + Sync + 'static,
    {
        RelationshipMapping {
            name,
            cardinality: Cardinality::ToMany,
            target: TypeId::of::<R>(),
            target_name: type_name::<R>(),
            get: related_fn(move |obj| {
                obj.downcast_ref::<T>().map(|t| {
                    Related::Many(get(t).into_iter().map(|r| r as &dyn Entity).collect())
                })
            }),
            set,
        }
    }
}

// --- helpers -----------------------------------------------------------------

fn getter<T, V, G>(get: G) -> GetFn
where
    T: Any,
    V: Serialize,
    G: Fn(&T) -> V + Send + Sync + 'static,
{
    Box::new(move |obj: &dyn Any| obj.downcast_ref::<T>().map(|t| serde_json::to_value(get(t))))
}

// Pins the higher-ranked signature so the returned borrow is tied to the argument.
fn related_fn<F>(f: F) -> RelatedFn
where
    F: for<'a> Fn(&'a dyn Any) -> Option<Related<'a>> + Send + Sync + 'static,
{
    Box::new(f)
}

fn downcast_related<R: Any>(related: Box<dyn Any>) -> Result<R, SetError> {
    related
        .downcast::<R>()
        .map(|r| *r)
        .map_err(|_| SetError::RelatedType {
            expected: type_name::<R>(),
        })
}

/// Whether `name` is usable as an attribute or relationship name.
pub fn is_valid_member_name(name: &str) -> bool {
    MEMBER_NAME_RE.is_match(name)
}

fn check_member_name(kind: &'static str, name: &str) -> Result<(), ConfigurationError> {
    if is_valid_member_name(name) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidMemberName {
            kind,
            name: name.to_string(),
        })
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Sample {
        id: u32,
        some_value: String,
        not_mapped: String,
        parent: Option<Box<Sample>>,
    }

    fn sample() -> Sample {
        Sample {
            id: 7,
            some_value: "text".into(),
            not_mapped: "hidden".into(),
            parent: None,
        }
    }

    fn mapping() -> ResourceMapping {
        ResourceMapping::builder("samples", |s: &Sample| s.id)
            .link_template("/samples/{id}")
            .attribute_rw("someValue", |s| s.some_value.clone(), |s, v| s.some_value = v)
            .attribute("length", |s| s.some_value.len())
            .has_one("parent", |s| s.parent.as_deref())
            .build()
            .unwrap()
    }

    #[test]
    fn reads_id_and_declared_attributes_only() {
        let m = mapping();
        let s = sample();
        assert_eq!(m.id_of(&s).unwrap(), "7");
        let attrs = m.attributes_of(&s).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["someValue"], json!("text"));
        assert_eq!(attrs["length"], json!(4));
        assert!(!attrs.contains_key("notMapped"));
        assert_eq!(s.not_mapped, "hidden");
    }

    #[test]
    fn accessor_on_wrong_type_is_a_mismatch() {
        let m = mapping();
        assert!(matches!(
            m.id_of(&"not a sample"),
            Err(TransformError::MappingMismatch { .. })
        ));
    }

    #[test]
    fn setter_coerces_json_values() {
        let m = mapping();
        let mut s = sample();
        let attr = m.attribute("someValue").unwrap();
        assert!(attr.set(&mut s, json!("changed")).unwrap().is_ok());
        assert_eq!(s.some_value, "changed");
        assert!(matches!(
            attr.set(&mut s, json!(12)),
            Some(Err(SetError::Coercion(_)))
        ));
        assert!(m.attribute("length").unwrap().set(&mut s, json!(1)).is_none());
    }

    #[test]
    fn relationship_accessor_reads_related() {
        let m = mapping();
        let mut s = sample();
        s.parent = Some(Box::new(Sample {
            id: 1,
            ..Sample::default()
        }));
        let rel = m.relationship("parent").unwrap();
        assert_eq!(rel.cardinality(), Cardinality::ToOne);
        match rel.related(&s) {
            Some(Related::One(Some(parent))) => {
                assert_eq!(m.id_of(parent.as_any()).unwrap(), "1");
            }
            _ => panic!("expected a related parent"),
        }
    }

    #[test]
    fn duplicate_member_rejected() {
        let err = ResourceMapping::builder("samples", |s: &Sample| s.id)
            .link_template("/samples/{id}")
            .attribute("value", |s| s.id)
            .has_one("value", |s| s.parent.as_deref())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateMember { .. }));
    }

    #[test]
    fn reserved_and_invalid_names_rejected() {
        let err = ResourceMapping::builder("samples", |s: &Sample| s.id)
            .link_template("/samples/{id}")
            .attribute("type", |s| s.id)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::ReservedMemberName("type".into()));

        let err = ResourceMapping::builder("samples", |s: &Sample| s.id)
            .link_template("/samples/{id}")
            .has_one("parent.child", |s| s.parent.as_deref())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidMemberName { .. }));
    }

    #[test]
    fn link_template_required() {
        let err = ResourceMapping::builder("samples", |s: &Sample| s.id)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedLinkTemplate { .. }));
    }
}
