//! Declarative mapping of in-memory object graphs to JSON:API-style
//! compound documents, and of sparse update documents back onto objects.
//!
//! Types are described once with a [`ResourceMapping`] (resource type, id,
//! self-link template, attributes, relationships), registered into a
//! [`Registry`], and transformed by a [`Transformer`] in either direction.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`mapping`] | Per-type declarations via [`ResourceMapping::builder`] |
//! | [`registry`] | [`RegistryBuilder`] (write phase) and the frozen [`Registry`] |
//! | [`context`] | Per-call [`Context`]: base URI and [`IncludePaths`] |
//! | [`link`] | Self-link templates and [`build_self_link`] |
//! | [`document`] | Wire types: [`CompoundDocument`], [`SingleResource`], [`UpdateDocument`] |
//! | [`transform`] | Forward and backward transformers |
//! | [`graph`] | [`DocumentGraph`] traversal over a parsed document |
//! | [`validation`] | Structural checks via [`validate_document`] |
//! | [`render`] | Human-readable text rendering |
//! | [`config`] | Wire encoding [`Settings`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use graphdoc::{Context, IncludePaths, Registry, ResourceMapping, Root, Transformer};
//!
//! let mut registry = Registry::builder();
//! registry
//!     .register(
//!         ResourceMapping::builder("articles", |a: &Article| a.id)
//!             .link_template("/articles/{id}")
//!             .attribute("title", |a| a.title.clone())
//!             .has_one("author", |a| Some(&a.author))
//!             .build()?,
//!     )?
//!     .register(
//!         ResourceMapping::builder("people", |p: &Person| p.id)
//!             .link_template("/people/{id}")
//!             .build()?,
//!     )?;
//! let transformer = Transformer::new(Arc::new(registry.build()?));
//!
//! let context = Context::parse("http://example.com/articles")?
//!     .with_include(IncludePaths::parse("author"));
//! let document = transformer.transform(Root::one(&article), &context)?;
//! let json = serde_json::to_string(&document)?;
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod entity;
pub mod error;
pub mod graph;
pub mod link;
pub mod mapping;
pub mod registry;
pub mod render;
pub mod transform;
pub mod validation;

pub use config::{Settings, MEDIA_TYPE};
pub use context::{Context, IncludePaths};
pub use document::{
    CompoundDocument, DocumentError, ErrorObject, Field, Linkage, Links, PrimaryData,
    Relationship, ResourceCollection, ResourceIdentifier, SingleResource, UpdateDocument,
    UpdateResource,
};
pub use entity::{Collection, Entity, MetaWrapper};
pub use error::{ConfigurationError, InvalidIncludePath, TransformError};
pub use graph::DocumentGraph;
pub use link::{build_self_link, LinkTemplate};
pub use mapping::{
    is_valid_member_name, AttributeMapping, Cardinality, MappingBuilder, RelationshipMapping,
    ResourceMapping,
};
pub use registry::{Registry, RegistryBuilder};
pub use render::{render_document, render_resource};
pub use transform::backward::{
    Applied, FailureKind, FieldFailure, InstanceFactory, LinkageResolver, Member, NewInstance,
    NoLinkage, ResolverMap, UpdateReport,
};
pub use transform::{Root, Transformer};
pub use validation::{validate_document, ValidationError};
