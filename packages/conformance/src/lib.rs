//! Sample domain for the graphdoc conformance test suite.
//!
//! Provides a small blog model ([`Article`], [`Comment`], [`Person`]) whose
//! graphs exercise every relationship shape the transformer handles: to-one,
//! to-many, optional, shared (diamond) and cyclic. [`SampleClass`] is a flat
//! type used for the attribute-only end-to-end checks.
//!
//! Shared related objects are held in `Rc`; a person's `friend` lives in a
//! `OnceCell` so tests can close a cycle after both ends exist.

use std::cell::OnceCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use graphdoc::{ConfigurationError, Registry, ResourceMapping};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub twitter: Option<String>,
    pub friend: OnceCell<Rc<Person>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub author: Option<Rc<Person>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub published: DateTime<Utc>,
    pub author: Rc<Person>,
    pub comments: Vec<Comment>,
}

/// A flat record with one field that is deliberately left unmapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleClass {
    pub id: u64,
    pub some_value: String,
    pub date_time: DateTime<Utc>,
    pub not_mapped: String,
}

impl Person {
    pub fn new(id: u64, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }
}

pub fn person_mapping() -> Result<ResourceMapping, ConfigurationError> {
    ResourceMapping::builder("people", |p: &Person| p.id)
        .link_template("/people/{id}")
        .attribute_rw("firstName", |p| p.first_name.clone(), |p, v| p.first_name = v)
        .attribute_rw("lastName", |p| p.last_name.clone(), |p, v| p.last_name = v)
        .attribute_rw("twitter", |p| p.twitter.clone(), |p, v| p.twitter = v)
        .has_one("friend", |p| p.friend.get().map(|f| &**f))
        .build()
}

pub fn comment_mapping() -> Result<ResourceMapping, ConfigurationError> {
    ResourceMapping::builder("comments", |c: &Comment| c.id)
        .link_template("/comments/{id}")
        .attribute_rw("body", |c| c.body.clone(), |c, v| c.body = v)
        .has_one_rw(
            "author",
            |c| c.author.as_deref(),
            |c, p: Option<Person>| c.author = p.map(Rc::new),
        )
        .build()
}

pub fn article_mapping() -> Result<ResourceMapping, ConfigurationError> {
    ResourceMapping::builder("articles", |a: &Article| a.id)
        .link_template("/articles/{id}")
        .attribute_rw("title", |a| a.title.clone(), |a, v| a.title = v)
        .attribute("published", |a| a.published)
        .has_one_rw(
            "author",
            |a| Some(&*a.author),
            |a, p: Option<Person>| {
                if let Some(p) = p {
                    a.author = Rc::new(p);
                }
            },
        )
        .has_many_rw(
            "comments",
            |a| a.comments.iter().collect(),
            |a, c| a.comments = c,
        )
        .build()
}

pub fn sample_mapping() -> Result<ResourceMapping, ConfigurationError> {
    ResourceMapping::builder("sampleClasses", |s: &SampleClass| s.id)
        .link_template("http://sampleClass/{id}")
        .attribute_rw("someValue", |s| s.some_value.clone(), |s, v| s.some_value = v)
        .attribute_rw("date", |s| s.date_time, |s, v| s.date_time = v)
        .build()
}

/// Registry with the blog types.
pub fn blog_registry() -> Result<Registry, ConfigurationError> {
    let mut builder = Registry::builder();
    builder
        .register(person_mapping()?)?
        .register(comment_mapping()?)?
        .register(article_mapping()?)?;
    builder.build()
}

/// Registry with [`SampleClass`] only.
pub fn sample_registry() -> Result<Registry, ConfigurationError> {
    let mut builder = Registry::builder();
    builder.register(sample_mapping()?)?;
    builder.build()
}

/// Two articles by the same author. The second article's comment is written
/// by that author too, so the author is reachable along three paths.
pub fn two_articles() -> Vec<Article> {
    let dan = Rc::new(Person::new(9, "Dan", "Gebhardt"));
    let alice = Rc::new(Person::new(2, "Alice", "Liddell"));
    let published = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();

    vec![
        Article {
            id: 1,
            title: "JSON API paints my bikeshed!".into(),
            published,
            author: Rc::clone(&dan),
            comments: vec![
                Comment {
                    id: 5,
                    body: "First!".into(),
                    author: Some(Rc::clone(&alice)),
                },
                Comment {
                    id: 12,
                    body: "I like XML better".into(),
                    author: None,
                },
            ],
        },
        Article {
            id: 2,
            title: "Rails is Omakase".into(),
            published,
            author: Rc::clone(&dan),
            comments: vec![Comment {
                id: 7,
                body: "Thanks for reading".into(),
                author: Some(Rc::clone(&dan)),
            }],
        },
    ]
}
