//! Update document → object.
//!
//! A sparse update is merged field by field. Only the members present in the
//! payload are touched; absent members keep their current values.
//!
//! # Partial application policy
//!
//! Field-level problems never abort the update. A member that is undeclared,
//! read-only, fails type coercion, carries linkage of the wrong shape or
//! resource type, or names a related resource the resolver cannot produce is
//! recorded as a [`FieldFailure`] in the returned [`UpdateReport`] and
//! skipped; every other member is still applied. The caller decides whether
//! a partially applied update is acceptable.
//!
//! Only document-level problems fail the whole call: the target type has no
//! mapping, or the document's `type` names a different resource type.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use thiserror::Error;

use crate::context::Context;
use crate::document::{ErrorObject, Linkage, ResourceIdentifier, UpdateDocument, UpdateResource};
use crate::error::TransformError;
use crate::mapping::{Cardinality, RelationshipMapping, Resolved, ResourceMapping, SetError};
use crate::transform::Transformer;

/// Produces live related instances from linkage.
///
/// How instances are fetched is up to the caller; run any I/O before the
/// backward transform and serve the results from memory here.
pub trait LinkageResolver {
    /// An instance of `mapping`'s runtime type for `identifier`, if one exists.
    fn resolve(&self, mapping: &ResourceMapping, identifier: &ResourceIdentifier) -> Option<Box<dyn Any>>;
}

impl<F> LinkageResolver for F
where
    F: Fn(&ResourceMapping, &ResourceIdentifier) -> Option<Box<dyn Any>>,
{
    fn resolve(&self, mapping: &ResourceMapping, identifier: &ResourceIdentifier) -> Option<Box<dyn Any>> {
        self(mapping, identifier)
    }
}

/// Resolves nothing; every relationship in an update is reported unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinkage;

impl LinkageResolver for NoLinkage {
    fn resolve(&self, _: &ResourceMapping, _: &ResourceIdentifier) -> Option<Box<dyn Any>> {
        None
    }
}

type LookupFn = Box<dyn Fn(&str) -> Option<Box<dyn Any>>>;

/// A resolver with one typed lookup per related type.
///
/// ```rust,ignore
/// let resolver = ResolverMap::new().with(|id: &str| people.get(id).cloned());
/// ```
#[derive(Default)]
pub struct ResolverMap {
    lookups: HashMap<TypeId, LookupFn>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the lookup for related instances of type `R`, keyed by id.
    pub fn with<R, F>(mut self, lookup: F) -> Self
    where
        R: Any,
        F: Fn(&str) -> Option<R> + 'static,
    {
        self.lookups.insert(
            TypeId::of::<R>(),
            Box::new(move |id: &str| lookup(id).map(|r| Box::new(r) as Box<dyn Any>)),
        );
        self
    }
}

impl LinkageResolver for ResolverMap {
    fn resolve(&self, mapping: &ResourceMapping, identifier: &ResourceIdentifier) -> Option<Box<dyn Any>> {
        self.lookups
            .get(&mapping.represented_type())
            .and_then(|lookup| lookup(&identifier.id))
    }
}

/// Construction policy for [`Transformer::transform_back_with`].
pub trait InstanceFactory<T> {
    /// Produce the instance the update is applied to; `id` is the update's id.
    fn instantiate(&self, id: Option<&str>) -> T;
}

/// The default policy: a fresh `T::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewInstance;

impl<T: Default> InstanceFactory<T> for NewInstance {
    fn instantiate(&self, _: Option<&str>) -> T {
        T::default()
    }
}

impl<T, F> InstanceFactory<T> for F
where
    F: Fn(Option<&str>) -> T,
{
    fn instantiate(&self, id: Option<&str>) -> T {
        self(id)
    }
}

/// Which member group of the update a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Attribute,
    Relationship,
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Attribute => write!(f, "attribute"),
            Member::Relationship => write!(f, "relationship"),
        }
    }
}

/// Why a single field of an update was not applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FailureKind {
    #[error("is not declared by the mapping")]
    Undeclared,

    #[error("has no setter")]
    ReadOnly,

    #[error("could not be coerced: {0}")]
    Coercion(String),

    #[error("expects {expected:?} linkage")]
    Cardinality { expected: Cardinality },

    #[error("links to {found:?} but expects {expected:?}")]
    LinkageType { expected: String, found: String },

    #[error("references {0}, which could not be resolved")]
    Unresolved(ResourceIdentifier),

    #[error("resolver produced an instance that is not a {expected}")]
    RelatedType { expected: &'static str },
}

/// A field of an update that was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{member} {field:?} {kind}")]
pub struct FieldFailure {
    pub member: Member,
    pub field: String,
    pub kind: FailureKind,
}

impl FieldFailure {
    /// Pointer to the field inside the update document.
    pub fn pointer(&self) -> String {
        match self.member {
            Member::Attribute => format!("/data/attributes/{}", self.field),
            Member::Relationship => format!("/data/relationships/{}", self.field),
        }
    }
}

impl From<&FieldFailure> for ErrorObject {
    fn from(f: &FieldFailure) -> Self {
        ErrorObject::new(422, "Unprocessable Entity")
            .with_detail(f.to_string())
            .with_source(f.pointer())
    }
}

/// Outcome of applying an update: which fields were written and which were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub applied: Vec<String>,
    pub failures: Vec<FieldFailure>,
}

impl UpdateReport {
    /// Whether every field in the update was applied.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, field: &str) -> Option<&FieldFailure> {
        self.failures.iter().find(|f| f.field == field)
    }

    fn fail(&mut self, member: Member, field: &str, kind: FailureKind) {
        tracing::debug!("backward: skipping {field:?}: {kind}");
        self.failures.push(FieldFailure {
            member,
            field: field.to_string(),
            kind,
        });
    }
}

/// A value produced by the backward transform together with its report.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub report: UpdateReport,
}

impl Transformer {
    /// Update document → new `T`, built with [`NewInstance`].
    pub fn transform_back<T: Any + Default>(
        &self,
        update: &UpdateDocument,
        context: &Context,
        resolver: &dyn LinkageResolver,
    ) -> Result<Applied<T>, TransformError> {
        self.transform_back_with(update, context, &NewInstance, resolver)
    }

    /// Update document → `T`, built by `factory`.
    pub fn transform_back_with<T, F>(
        &self,
        update: &UpdateDocument,
        context: &Context,
        factory: &F,
        resolver: &dyn LinkageResolver,
    ) -> Result<Applied<T>, TransformError>
    where
        T: Any,
        F: InstanceFactory<T> + ?Sized,
    {
        let mapping = self.target_mapping::<T>(&update.data)?;
        let mut value = factory.instantiate(update.data.id.as_deref());
        let report = self.apply_with(mapping, update, &mut value, context, resolver)?;
        Ok(Applied { value, report })
    }

    /// Merge `update` into an existing `target`.
    pub fn apply<T: Any>(
        &self,
        update: &UpdateDocument,
        target: &mut T,
        context: &Context,
        resolver: &dyn LinkageResolver,
    ) -> Result<UpdateReport, TransformError> {
        let mapping = self.target_mapping::<T>(&update.data)?;
        self.apply_with(mapping, update, target, context, resolver)
    }

    fn target_mapping<T: Any>(&self, data: &UpdateResource) -> Result<&ResourceMapping, TransformError> {
        let mapping = self
            .registry
            .resolve::<T>()
            .ok_or(TransformError::MissingMapping {
                type_name: type_name::<T>(),
            })?;
        if let Some(found) = &data.resource_type {
            if found != mapping.resource_type() {
                return Err(TransformError::ResourceTypeMismatch {
                    expected: mapping.resource_type().to_string(),
                    found: found.clone(),
                });
            }
        }
        Ok(mapping)
    }

    fn apply_with(
        &self,
        mapping: &ResourceMapping,
        update: &UpdateDocument,
        target: &mut dyn Any,
        context: &Context,
        resolver: &dyn LinkageResolver,
    ) -> Result<UpdateReport, TransformError> {
        tracing::debug!(
            "backward: applying {} update ({} attributes, {} relationships) for {}",
            mapping.resource_type(),
            update.data.attributes.len(),
            update.data.relationships.len(),
            context.base_uri()
        );
        let mut report = UpdateReport::default();

        for (name, value) in &update.data.attributes {
            let Some(attribute) = mapping.attribute(name) else {
                report.fail(Member::Attribute, name, FailureKind::Undeclared);
                continue;
            };
            match attribute.set(target, value.clone()) {
                None => report.fail(Member::Attribute, name, FailureKind::ReadOnly),
                Some(Ok(())) => report.applied.push(name.clone()),
                Some(Err(SetError::Coercion(e))) => {
                    report.fail(Member::Attribute, name, FailureKind::Coercion(e.to_string()))
                }
                Some(Err(_)) => return Err(mapping.mismatch()),
            }
        }

        for (name, relationship) in &update.data.relationships {
            let Some(declared) = mapping.relationship(name) else {
                report.fail(Member::Relationship, name, FailureKind::Undeclared);
                continue;
            };
            if !declared.is_writable() {
                report.fail(Member::Relationship, name, FailureKind::ReadOnly);
                continue;
            }
            let related = self.related_mapping(declared)?;
            let resolved = match resolve_linkage(declared, related, &relationship.data, resolver) {
                Ok(resolved) => resolved,
                Err(kind) => {
                    report.fail(Member::Relationship, name, kind);
                    continue;
                }
            };
            match declared.set(target, resolved) {
                None => report.fail(Member::Relationship, name, FailureKind::ReadOnly),
                Some(Ok(())) => report.applied.push(name.clone()),
                Some(Err(SetError::RelatedType { expected })) => {
                    report.fail(Member::Relationship, name, FailureKind::RelatedType { expected })
                }
                Some(Err(SetError::Cardinality)) => report.fail(
                    Member::Relationship,
                    name,
                    FailureKind::Cardinality {
                        expected: declared.cardinality(),
                    },
                ),
                Some(Err(SetError::Target | SetError::Coercion(_))) => return Err(mapping.mismatch()),
            }
        }

        Ok(report)
    }

    fn related_mapping(&self, relationship: &RelationshipMapping) -> Result<&ResourceMapping, TransformError> {
        self.registry
            .resolve_type_id(relationship.target())
            .ok_or(TransformError::MissingMapping {
                type_name: relationship.target_name(),
            })
    }
}

fn resolve_linkage(
    relationship: &RelationshipMapping,
    related: &ResourceMapping,
    linkage: &Linkage,
    resolver: &dyn LinkageResolver,
) -> Result<Resolved, FailureKind> {
    match (relationship.cardinality(), linkage) {
        (Cardinality::ToOne, Linkage::One(None)) => Ok(Resolved::One(None)),
        (Cardinality::ToOne, Linkage::One(Some(identifier))) => {
            resolve_identifier(related, identifier, resolver).map(|r| Resolved::One(Some(r)))
        }
        (Cardinality::ToMany, Linkage::Many(identifiers)) => identifiers
            .iter()
            .map(|identifier| resolve_identifier(related, identifier, resolver))
            .collect::<Result<Vec<_>, _>>()
            .map(Resolved::Many),
        (expected, _) => Err(FailureKind::Cardinality { expected }),
    }
}

fn resolve_identifier(
    related: &ResourceMapping,
    identifier: &ResourceIdentifier,
    resolver: &dyn LinkageResolver,
) -> Result<Box<dyn Any>, FailureKind> {
    if identifier.resource_type != related.resource_type() {
        return Err(FailureKind::LinkageType {
            expected: related.resource_type().to_string(),
            found: identifier.resource_type.clone(),
        });
    }
    resolver
        .resolve(related, identifier)
        .ok_or_else(|| FailureKind::Unresolved(identifier.clone()))
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::registry::Registry;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        id: u32,
        some_value: String,
        count: u32,
        owner: Option<Owner>,
        watchers: Vec<Owner>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Owner {
        id: u32,
    }

    fn transformer() -> Transformer {
        let mut builder = Registry::builder();
        builder
            .register(
                ResourceMapping::builder("samples", |s: &Sample| s.id)
                    .link_template("/samples/{id}")
                    .attribute_rw("someValue", |s| s.some_value.clone(), |s, v| s.some_value = v)
                    .attribute_rw("count", |s| s.count, |s, v| s.count = v)
                    .attribute("summary", |s| format!("{}:{}", s.some_value, s.count))
                    .has_one_rw("owner", |s| s.owner.as_ref(), |s, o| s.owner = o)
                    .has_many_rw("watchers", |s| s.watchers.iter().collect(), |s, w| s.watchers = w)
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .register(
                ResourceMapping::builder("owners", |o: &Owner| o.id)
                    .link_template("/owners/{id}")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        Transformer::new(Arc::new(builder.build().unwrap()))
    }

    fn context() -> Context {
        Context::parse("http://example.com/samples").unwrap()
    }

    fn owners() -> ResolverMap {
        ResolverMap::new().with(|id: &str| match id {
            "1" | "2" => id.parse().ok().map(|id| Owner { id }),
            _ => None,
        })
    }

    fn existing() -> Sample {
        Sample {
            id: 5,
            some_value: "before".into(),
            count: 3,
            owner: Some(Owner { id: 9 }),
            watchers: vec![],
        }
    }

    #[test]
    fn sparse_attribute_update_touches_only_that_field() {
        let t = transformer();
        let update = UpdateDocument::from(UpdateResource::new().with_attribute("someValue", json!("x")));
        let mut sample = existing();

        let report = t.apply(&update, &mut sample, &context(), &NoLinkage).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.applied, ["someValue"]);
        assert_eq!(
            sample,
            Sample {
                some_value: "x".into(),
                ..existing()
            }
        );
    }

    #[test]
    fn transform_back_builds_a_new_instance() {
        let t = transformer();
        let update = UpdateDocument::from(
            UpdateResource::new()
                .with_type("samples")
                .with_attribute("someValue", json!("fresh"))
                .with_attribute("count", json!(8)),
        );
        let applied: Applied<Sample> = t.transform_back(&update, &context(), &NoLinkage).unwrap();
        assert_eq!(applied.value.some_value, "fresh");
        assert_eq!(applied.value.count, 8);
        assert_eq!(applied.value.id, 0);
    }

    #[test]
    fn factory_receives_the_update_id() {
        let t = transformer();
        let update = UpdateDocument::from(UpdateResource::new().with_id("42"));
        let factory = |id: Option<&str>| Sample {
            id: id.and_then(|i| i.parse().ok()).unwrap_or_default(),
            ..Sample::default()
        };
        let applied = t
            .transform_back_with(&update, &context(), &factory, &NoLinkage)
            .unwrap();
        assert_eq!(applied.value.id, 42);
    }

    #[test]
    fn field_failures_do_not_abort_the_update() {
        let t = transformer();
        let update = UpdateDocument::from(
            UpdateResource::new()
                .with_attribute("someValue", json!("kept"))
                .with_attribute("count", json!("not a number"))
                .with_attribute("summary", json!("read only"))
                .with_attribute("bogus", json!(1)),
        );
        let mut sample = existing();
        let report = t.apply(&update, &mut sample, &context(), &NoLinkage).unwrap();

        assert_eq!(report.applied, ["someValue"]);
        assert!(matches!(report.failure("count").unwrap().kind, FailureKind::Coercion(_)));
        assert_eq!(report.failure("summary").unwrap().kind, FailureKind::ReadOnly);
        assert_eq!(report.failure("bogus").unwrap().kind, FailureKind::Undeclared);
        assert_eq!(sample.some_value, "kept");
        assert_eq!(sample.count, 3);
        assert_eq!(
            report.failure("count").unwrap().pointer(),
            "/data/attributes/count"
        );
    }

    #[test]
    fn relationships_are_resolved_and_set() {
        let t = transformer();
        let update = UpdateDocument::from(
            UpdateResource::new()
                .with_relationship(
                    "owner",
                    Linkage::One(Some(ResourceIdentifier::new("owners", "1"))),
                )
                .with_relationship(
                    "watchers",
                    Linkage::Many(vec![
                        ResourceIdentifier::new("owners", "1"),
                        ResourceIdentifier::new("owners", "2"),
                    ]),
                ),
        );
        let mut sample = existing();
        let report = t.apply(&update, &mut sample, &context(), &owners()).unwrap();

        assert!(report.is_complete());
        assert_eq!(sample.owner, Some(Owner { id: 1 }));
        assert_eq!(sample.watchers, [Owner { id: 1 }, Owner { id: 2 }]);
    }

    #[test]
    fn null_linkage_clears_a_to_one() {
        let t = transformer();
        let update = UpdateDocument::from(UpdateResource::new().with_relationship("owner", Linkage::One(None)));
        let mut sample = existing();
        t.apply(&update, &mut sample, &context(), &NoLinkage).unwrap();
        assert_eq!(sample.owner, None);
    }

    #[test]
    fn unresolvable_linkage_is_reported_per_field() {
        let t = transformer();
        let update = UpdateDocument::from(
            UpdateResource::new()
                .with_attribute("someValue", json!("applied"))
                .with_relationship(
                    "owner",
                    Linkage::One(Some(ResourceIdentifier::new("owners", "404"))),
                )
                .with_relationship(
                    "watchers",
                    Linkage::Many(vec![ResourceIdentifier::new("people", "1")]),
                ),
        );
        let mut sample = existing();
        let report = t.apply(&update, &mut sample, &context(), &owners()).unwrap();

        assert_eq!(report.applied, ["someValue"]);
        assert_eq!(
            report.failure("owner").unwrap().kind,
            FailureKind::Unresolved(ResourceIdentifier::new("owners", "404"))
        );
        assert!(matches!(
            report.failure("watchers").unwrap().kind,
            FailureKind::LinkageType { .. }
        ));
        assert_eq!(sample.owner, Some(Owner { id: 9 }));
    }

    #[test]
    fn wrong_linkage_shape_is_a_cardinality_failure() {
        let t = transformer();
        let update = UpdateDocument::from(UpdateResource::new().with_relationship("owner", Linkage::Many(vec![])));
        let mut sample = existing();
        let report = t.apply(&update, &mut sample, &context(), &owners()).unwrap();
        assert_eq!(
            report.failure("owner").unwrap().kind,
            FailureKind::Cardinality {
                expected: Cardinality::ToOne
            }
        );
    }

    #[test]
    fn mismatched_document_type_fails_the_whole_update() {
        let t = transformer();
        let update = UpdateDocument::from(
            UpdateResource::new()
                .with_type("owners")
                .with_attribute("someValue", json!("x")),
        );
        let mut sample = existing();
        let err = t.apply(&update, &mut sample, &context(), &NoLinkage).unwrap_err();
        assert!(matches!(err, TransformError::ResourceTypeMismatch { .. }));
        assert_eq!(sample, existing());
    }

    #[test]
    fn unmapped_target_type_fails() {
        let t = transformer();
        let err = t
            .transform_back::<String>(&UpdateDocument::default(), &context(), &NoLinkage)
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingMapping { .. }));
    }
}
