//! The transformation engine.
//!
//! [`Transformer`] is the caller-facing entry point for both directions:
//!
//! - [`Transformer::transform`] turns an object graph into a
//!   [`CompoundDocument`] (see [`forward`]).
//! - [`Transformer::transform_back`] and [`Transformer::apply`] turn an
//!   [`UpdateDocument`](crate::UpdateDocument) into a new or updated object
//!   (see [`backward`]).
//!
//! A transformer holds nothing but a shared handle to the frozen
//! [`Registry`]; all per-call state lives inside the call, so one
//! transformer can serve any number of concurrent operations.

pub mod backward;
pub mod forward;

use std::any::Any;
use std::sync::Arc;

use crate::context::Context;
use crate::document::CompoundDocument;
use crate::entity::{Entity, MetaWrapper};
use crate::error::TransformError;
use crate::registry::Registry;

/// The shape of a forward-transform input, resolved once at the entry point.
pub enum Root<'a> {
    Null,
    Scalar(&'a dyn Entity),
    /// Elements may be of different mapped types; order is preserved.
    Collection(Vec<&'a dyn Entity>),
}

impl<'a> Root<'a> {
    pub fn one<T: Any>(value: &'a T) -> Self {
        Root::Scalar(value)
    }

    pub fn optional<T: Any>(value: Option<&'a T>) -> Self {
        value.map_or(Root::Null, Root::one)
    }

    pub fn many<T: Any>(items: impl IntoIterator<Item = &'a T>) -> Self {
        Root::Collection(items.into_iter().map(|i| i as &dyn Entity).collect())
    }
}

/// Entry point for forward and backward transforms over one registry.
#[derive(Debug, Clone)]
pub struct Transformer {
    registry: Arc<Registry>,
}

impl Transformer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Object graph → compound document.
    pub fn transform(&self, root: Root<'_>, context: &Context) -> Result<CompoundDocument, TransformError> {
        forward::transform(&self.registry, root, context)
    }

    /// Transform the wrapped value and attach the wrapper's metadata to the document.
    pub fn transform_wrapped<T: Any>(
        &self,
        wrapped: &MetaWrapper<T>,
        context: &Context,
    ) -> Result<CompoundDocument, TransformError> {
        let mut document = self.transform(Root::one(&wrapped.value), context)?;
        if !wrapped.meta.is_empty() {
            document.meta = Some(wrapped.meta.clone());
        }
        Ok(document)
    }

    /// Whether `paths` only follow relationships declared from the root's mapping.
    ///
    /// A `null` root accepts only an empty include list. A collection root is
    /// checked against each element's mapping.
    pub fn validate_included_relationship_paths<S: AsRef<str>>(
        &self,
        paths: &[S],
        root: &Root<'_>,
    ) -> Result<bool, TransformError> {
        let values: Vec<&dyn Entity> = match root {
            Root::Null => return Ok(paths.is_empty()),
            Root::Scalar(value) => vec![*value],
            Root::Collection(items) => items.clone(),
        };
        for value in values {
            if self.registry.find_invalid_include_path(paths, value)?.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// --- tests -------------------------------------------------------------------
