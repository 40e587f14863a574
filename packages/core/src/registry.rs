//! The process-wide store of resource mappings.
//!
//! Registration happens on a [`RegistryBuilder`]; [`RegistryBuilder::build`]
//! checks the declarations against each other and freezes them into a
//! [`Registry`], which has no mutating methods. Share the frozen registry
//! between concurrent operations with an `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::{Collection, Entity};
use crate::error::{ConfigurationError, InvalidIncludePath, TransformError};
use crate::mapping::ResourceMapping;

/// Mutable registration phase of a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    mappings: Vec<ResourceMapping>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping, replacing any earlier mapping of the same runtime type.
    ///
    /// Fails if another runtime type already claimed the resource-type name.
    pub fn register(&mut self, mapping: ResourceMapping) -> Result<&mut Self, ConfigurationError> {
        if let Some(existing) = self.mappings.iter().find(|m| {
            m.resource_type() == mapping.resource_type()
                && m.represented_type() != mapping.represented_type()
        }) {
            return Err(ConfigurationError::DuplicateResourceType {
                resource_type: mapping.resource_type().to_string(),
                existing: existing.type_name(),
                rejected: mapping.type_name(),
            });
        }

        match self
            .mappings
            .iter()
            .position(|m| m.represented_type() == mapping.represented_type())
        {
            Some(index) => {
                tracing::warn!(
                    "registry: replacing mapping of {} ({:?} -> {:?})",
                    mapping.type_name(),
                    self.mappings[index].resource_type(),
                    mapping.resource_type()
                );
                self.mappings[index] = mapping;
            }
            None => {
                tracing::debug!(
                    "registry: {} registered as {:?}",
                    mapping.type_name(),
                    mapping.resource_type()
                );
                self.mappings.push(mapping);
            }
        }
        Ok(self)
    }

    /// Whether `T` has a mapping registered so far.
    pub fn is_registered<T: Any>(&self) -> bool {
        self.mappings.iter().any(|m| m.represented_type() == TypeId::of::<T>())
    }

    /// Freeze the registry.
    ///
    /// Every relationship must point at a type that has a mapping of its own.
    pub fn build(self) -> Result<Registry, ConfigurationError> {
        for mapping in &self.mappings {
            for relationship in mapping.relationships() {
                if !self.mappings.iter().any(|m| m.represented_type() == relationship.target()) {
                    return Err(ConfigurationError::UnregisteredRelationshipTarget {
                        resource_type: mapping.resource_type().to_string(),
                        relationship: relationship.name().to_string(),
                        target: relationship.target_name(),
                    });
                }
            }
        }

        let by_type = self
            .mappings
            .iter()
            .enumerate()
            .map(|(i, m)| (m.represented_type(), i))
            .collect();
        let by_collection_type = self
            .mappings
            .iter()
            .enumerate()
            .flat_map(|(i, m)| m.collection_types().iter().map(move |&t| (t, i)))
            .collect();
        let by_resource_type = self
            .mappings
            .iter()
            .enumerate()
            .map(|(i, m)| (m.resource_type().to_string(), i))
            .collect();

        tracing::debug!("registry: frozen with {} mappings", self.mappings.len());
        Ok(Registry {
            mappings: self.mappings,
            by_type,
            by_collection_type,
            by_resource_type,
        })
    }
}

/// Immutable, read-only set of mappings indexed by runtime type and by
/// resource-type name.
#[derive(Debug)]
pub struct Registry {
    mappings: Vec<ResourceMapping>,
    by_type: HashMap<TypeId, usize>,
    /// `Vec<T>`, `VecDeque<T>` and friends, keyed to `T`'s mapping.
    by_collection_type: HashMap<TypeId, usize>,
    by_resource_type: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn is_mapped<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Whether the element type of the collection `C` is mapped.
    pub fn is_mapped_collection<C: Collection + ?Sized>(&self) -> bool {
        self.is_mapped::<C::Element>()
    }

    pub fn resolve<T: Any>(&self) -> Option<&ResourceMapping> {
        self.resolve_type_id(TypeId::of::<T>())
    }

    /// The mapping of the element type of `C`.
    pub fn resolve_collection<C: Collection + ?Sized>(&self) -> Option<&ResourceMapping> {
        self.resolve::<C::Element>()
    }

    pub fn resolve_type_id(&self, type_id: TypeId) -> Option<&ResourceMapping> {
        self.by_type.get(&type_id).map(|&i| &self.mappings[i])
    }

    /// Resolve through the runtime type of `value`.
    ///
    /// A standard collection (`Vec<T>`, `VecDeque<T>`, `HashSet<T>`,
    /// `BTreeSet<T>`, `Box<[T]>`) resolves to the mapping of `T`.
    pub fn resolve_value(&self, value: &dyn Entity) -> Option<&ResourceMapping> {
        let type_id = value.as_any().type_id();
        self.resolve_type_id(type_id).or_else(|| {
            self.by_collection_type
                .get(&type_id)
                .map(|&i| &self.mappings[i])
        })
    }

    pub fn resolve_resource_type(&self, resource_type: &str) -> Option<&ResourceMapping> {
        self.by_resource_type
            .get(resource_type)
            .map(|&i| &self.mappings[i])
    }

    /// All mappings in registration order.
    pub fn all(&self) -> impl Iterator<Item = &ResourceMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Whether `paths` only follow relationships declared from `T`'s mapping.
    ///
    /// Fails with [`TransformError::MissingMapping`] if `T` has no mapping.
    pub fn validate_include_paths<T: Any, S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<bool, TransformError> {
        let mapping = self.resolve::<T>().ok_or(TransformError::MissingMapping {
            type_name: std::any::type_name::<T>(),
        })?;
        Ok(mapping.validate_included_relationship_paths(paths, self))
    }

    /// The first invalid path in `paths`, starting from `value`'s mapping.
    ///
    /// A collection value is checked against its element mapping.
    pub fn find_invalid_include_path<S: AsRef<str>>(
        &self,
        paths: &[S],
        value: &dyn Entity,
    ) -> Result<Option<InvalidIncludePath>, TransformError> {
        let mapping = self
            .resolve_value(value)
            .ok_or(TransformError::MissingMapping {
                type_name: value.type_name(),
            })?;
        Ok(mapping.find_invalid_include_path(paths, self))
    }
}
