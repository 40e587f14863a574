//! Runtime typing of domain objects.
//!
//! Mappings are looked up by the runtime type of a value. [`Entity`] gives
//! any `'static` value a type-erased view (`&dyn Any`) plus a readable type
//! name for error messages; [`Collection`] names the element type of the
//! standard collections so a collection type can be unwrapped before lookup.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashSet, VecDeque};

use serde_json::{Map, Value};

/// A value whose mapping can be resolved at runtime.
///
/// Implemented for every `'static` type.
pub trait Entity: Any {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;
}

impl<T: Any> Entity for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// A collection type whose element type carries the mapping.
pub trait Collection {
    type Element: Any;
}

impl<T: Any> Collection for Vec<T> {
    type Element = T;
}

impl<T: Any> Collection for [T] {
    type Element = T;
}

impl<T: Any, const N: usize> Collection for [T; N] {
    type Element = T;
}

impl<T: Any> Collection for VecDeque<T> {
    type Element = T;
}

impl<T: Any> Collection for HashSet<T> {
    type Element = T;
}

impl<T: Any> Collection for BTreeSet<T> {
    type Element = T;
}

impl<T: Any> Collection for Box<[T]> {
    type Element = T;
}

/// Runtime types of the owned collections of `T`, so a type-erased
/// collection value can be unwrapped to its element mapping.
pub(crate) fn collection_type_ids<T: Any>() -> [TypeId; 5] {
    [
        TypeId::of::<Vec<T>>(),
        TypeId::of::<VecDeque<T>>(),
        TypeId::of::<HashSet<T>>(),
        TypeId::of::<BTreeSet<T>>(),
        TypeId::of::<Box<[T]>>(),
    ]
}

/// A root value accompanied by top-level document metadata.
///
/// Only meaningful as the root of a transform (see
/// [`Transformer::transform_wrapped`](crate::Transformer::transform_wrapped)).
/// A wrapper has no mapping of its own, so a collection of wrappers, or a
/// relationship pointing at one, is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaWrapper<T> {
    pub value: T,
    pub meta: Map<String, Value>,
}

impl<T> MetaWrapper<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}
