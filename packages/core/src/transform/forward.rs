//! Object graph → compound document.
//!
//! The walk is depth-first over the relationships selected by the context's
//! include paths. Every resource placed into the document is remembered by
//! its `(type, id)`; reaching a remembered resource again emits linkage only.
//! That keeps cyclic graphs finite and diamond-shaped graphs de-duplicated,
//! without touching the source objects.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::context::Context;
use crate::document::{
    CompoundDocument, Linkage, Links, PrimaryData, Relationship, ResourceCollection,
    ResourceIdentifier, SingleResource,
};
use crate::entity::Entity;
use crate::error::TransformError;
use crate::link::build_self_link;
use crate::mapping::{Related, ResourceMapping};
use crate::registry::Registry;
use crate::transform::Root;

/// Transform `root` into a compound document.
pub fn transform(
    registry: &Registry,
    root: Root<'_>,
    context: &Context,
) -> Result<CompoundDocument, TransformError> {
    let mut walk = Walk::new(registry, context);

    let primary = match root {
        Root::Null => PrimaryData::Null,
        Root::Scalar(value) => {
            let mapping = mapping_of(registry, value).ok_or(TransformError::MissingMapping {
                type_name: value.type_name(),
            })?;
            walk.mark_primary(value, mapping)?;
            PrimaryData::Single(walk.resource(value, mapping, "")?)
        }
        Root::Collection(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, value) in items.into_iter().enumerate() {
                let mapping = mapping_of(registry, value).ok_or(TransformError::UnsupportedElement {
                    index,
                    type_name: value.type_name(),
                })?;
                walk.mark_primary(value, mapping)?;
                mapped.push((value, mapping));
            }
            let resources = mapped
                .into_iter()
                .map(|(value, mapping)| walk.resource(value, mapping, ""))
                .collect::<Result<ResourceCollection, _>>()?;
            PrimaryData::Collection(resources)
        }
    };

    let mut document = CompoundDocument::new(primary);
    document.included = walk.into_included();
    document
        .links
        .insert("self".into(), context.base_uri().to_string());
    Ok(document)
}

/// The mapping of `value`'s own runtime type. Collections are never
/// resources, so unlike [`Registry::resolve_value`] this does not unwrap them.
fn mapping_of<'r>(registry: &'r Registry, value: &dyn Entity) -> Option<&'r ResourceMapping> {
    registry.resolve_type_id(value.as_any().type_id())
}

/// State of one forward transform. Never shared between calls.
struct Walk<'r> {
    registry: &'r Registry,
    context: &'r Context,
    /// Primary and included resources seen so far.
    seen: HashSet<ResourceIdentifier>,
    /// Slots are reserved on discovery and filled once the resource is built,
    /// so the order is discovery order, not completion order.
    included: IndexMap<ResourceIdentifier, Option<SingleResource>>,
}

impl<'r> Walk<'r> {
    fn new(registry: &'r Registry, context: &'r Context) -> Self {
        Self {
            registry,
            context,
            seen: HashSet::new(),
            included: IndexMap::new(),
        }
    }

    // Primary resources are never copied into the included set.
    fn mark_primary(&mut self, value: &dyn Entity, mapping: &ResourceMapping) -> Result<(), TransformError> {
        let id = mapping.id_of(value.as_any())?;
        self.seen
            .insert(ResourceIdentifier::new(mapping.resource_type(), id));
        Ok(())
    }

    /// Build the representation of `value`, whose relationships live under `prefix`.
    fn resource(
        &mut self,
        value: &dyn Entity,
        mapping: &ResourceMapping,
        prefix: &str,
    ) -> Result<SingleResource, TransformError> {
        let obj = value.as_any();
        let id = mapping.id_of(obj)?;
        let attributes = mapping.attributes_of(obj)?;

        let self_link = build_self_link(self.context.base_uri(), mapping, &id).map_err(|source| {
            TransformError::Link {
                resource_type: mapping.resource_type().to_string(),
                id: id.clone(),
                source,
            }
        })?;
        let mut links = Links::new();
        links.insert("self".into(), self_link.to_string());

        let mut relationships = IndexMap::new();
        for relationship in mapping.relationships() {
            let path = if prefix.is_empty() {
                relationship.name().to_string()
            } else {
                format!("{prefix}.{}", relationship.name())
            };
            if !self.context.include().requests(&path) {
                continue;
            }

            let data = match relationship.related(obj).ok_or_else(|| mapping.mismatch())? {
                Related::One(None) => Linkage::One(None),
                Related::One(Some(related)) => Linkage::One(Some(self.visit(related, &path)?)),
                Related::Many(items) => Linkage::Many(
                    items
                        .into_iter()
                        .map(|related| self.visit(related, &path))
                        .collect::<Result<_, _>>()?,
                ),
            };
            relationships.insert(relationship.name().to_string(), Relationship { data });
        }

        Ok(SingleResource {
            id,
            resource_type: mapping.resource_type().to_string(),
            attributes,
            relationships,
            links,
        })
    }

    /// Linkage to `related`, including it on first sight.
    fn visit(&mut self, related: &dyn Entity, path: &str) -> Result<ResourceIdentifier, TransformError> {
        let registry = self.registry;
        let mapping = mapping_of(registry, related)
            .ok_or(TransformError::MissingMapping {
                type_name: related.type_name(),
            })?;
        let key = ResourceIdentifier::new(mapping.resource_type(), mapping.id_of(related.as_any())?);

        if !self.seen.insert(key.clone()) {
            tracing::trace!("forward: {key} already placed, linkage only ({path})");
            return Ok(key);
        }

        tracing::trace!("forward: including {key} ({path})");
        self.included.insert(key.clone(), None);
        let resource = self.resource(related, mapping, path)?;
        self.included.insert(key.clone(), Some(resource));
        Ok(key)
    }

    fn into_included(self) -> Vec<SingleResource> {
        self.included.into_values().flatten().collect()
    }
}

// --- tests -------------------------------------------------------------------
