use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::document::{CompoundDocument, ResourceIdentifier, SingleResource};

/// The resources of a [`CompoundDocument`] connected by their relationship linkage.
///
/// The graph borrows the document; it is a traversal structure, not a copy.
/// Resources are indexed by `(type, id)` over primary data followed by the
/// included set. A duplicate identifier replaces the earlier entry; use
/// [`validate_document`](crate::validate_document) to reject such documents.
#[derive(Debug, Default)]
pub struct DocumentGraph<'d> {
    resources: IndexMap<ResourceIdentifier, &'d SingleResource>,
    primary: Vec<ResourceIdentifier>,
}

impl<'d> DocumentGraph<'d> {
    pub fn new(document: &'d CompoundDocument) -> Self {
        let primary: Vec<&SingleResource> = document.primary_resources();
        let mut resources = IndexMap::new();
        for r in primary.iter().copied().chain(&document.included) {
            resources.insert(r.identifier(), r);
        }
        Self {
            resources,
            primary: primary.iter().map(|r| r.identifier()).collect(),
        }
    }

    pub fn get(&self, key: &ResourceIdentifier) -> Option<&'d SingleResource> {
        self.resources.get(key).copied()
    }

    /// Total number of distinct resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate over all resources, primary data first, in document order.
    pub fn resources(&self) -> impl Iterator<Item = &'d SingleResource> + '_ {
        self.resources.values().copied()
    }

    /// Identifiers of the primary resources, in document order.
    pub fn primary(&self) -> &[ResourceIdentifier] {
        &self.primary
    }

    /// The resources `key` links to (outgoing edges).
    ///
    /// Linkage to resources absent from the document is omitted.
    pub fn outgoing(&self, key: &ResourceIdentifier) -> Vec<&'d SingleResource> {
        let Some(resource) = self.resources.get(key) else {
            return vec![];
        };
        resource
            .relationships
            .values()
            .flat_map(|r| r.data.identifiers())
            .filter_map(|target| self.get(target))
            .collect()
    }

    /// The resources that link to `key` (incoming edges).
    pub fn incoming(&self, key: &ResourceIdentifier) -> Vec<&'d SingleResource> {
        self.resources
            .values()
            .copied()
            .filter(|r| {
                r.relationships
                    .values()
                    .any(|rel| rel.data.identifiers().contains(&key))
            })
            .collect()
    }

    /// Linkage targets that do not resolve to a resource in the document.
    pub fn dangling(&self) -> Vec<&'d ResourceIdentifier> {
        let mut seen = HashSet::new();
        self.resources
            .values()
            .copied()
            .flat_map(|r| r.relationships.values())
            .flat_map(|rel| rel.data.identifiers())
            .filter(|target| !self.resources.contains_key(*target))
            .filter(|target| seen.insert(*target))
            .collect()
    }

    /// All resources reachable from primary data by following linkage,
    /// in breadth-first order. Primary resources themselves are excluded.
    pub fn reachable(&self) -> Vec<&'d SingleResource> {
        let mut visited: HashSet<&ResourceIdentifier> = self.primary.iter().collect();
        let mut queue: VecDeque<&ResourceIdentifier> = self.primary.iter().collect();
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for neighbour in self.outgoing(current) {
                let Some((key, _)) = self.resources.get_key_value(&neighbour.identifier()) else {
                    continue;
                };
                if visited.insert(key) {
                    queue.push_back(key);
                    result.push(neighbour);
                }
            }
        }

        result
    }

    /// Resources that are neither primary data nor reachable from it.
    pub fn unreachable(&self) -> Vec<&'d SingleResource> {
        let reachable: HashSet<ResourceIdentifier> =
            self.reachable().iter().map(|r| r.identifier()).collect();
        self.resources
            .iter()
            .filter(|(key, _)| !self.primary.contains(*key) && !reachable.contains(*key))
            .map(|(_, r)| *r)
            .collect()
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Linkage, PrimaryData, Relationship};

    fn resource(id: &str, links: Vec<(&str, Vec<&str>)>) -> SingleResource {
        SingleResource {
            id: id.into(),
            resource_type: "nodes".into(),
            attributes: Default::default(),
            relationships: links
                .into_iter()
                .map(|(name, targets)| {
                    let data = Linkage::Many(
                        targets
                            .into_iter()
                            .map(|t| ResourceIdentifier::new("nodes", t))
                            .collect(),
                    );
                    (name.to_string(), Relationship { data })
                })
                .collect(),
            links: Default::default(),
        }
    }

    fn key(id: &str) -> ResourceIdentifier {
        ResourceIdentifier::new("nodes", id)
    }

    fn ids(resources: Vec<&SingleResource>) -> Vec<&str> {
        resources.into_iter().map(|r| r.id.as_str()).collect()
    }

    fn document() -> CompoundDocument {
        // 1 -> 2 -> 3 -> 1, 4 is orphaned, 2 also points at 9 which is absent.
        let mut doc = CompoundDocument::new(PrimaryData::Single(resource("1", vec![("next", vec!["2"])])));
        doc.included = vec![
            resource("2", vec![("next", vec!["3", "9"])]),
            resource("3", vec![("next", vec!["1"])]),
            resource("4", vec![]),
        ];
        doc
    }

    #[test]
    fn indexes_primary_and_included() {
        let doc = document();
        let g = DocumentGraph::new(&doc);
        assert_eq!(g.len(), 4);
        assert_eq!(g.primary(), [key("1")]);
        assert_eq!(g.get(&key("3")).map(|r| r.id.as_str()), Some("3"));
        assert!(g.get(&ResourceIdentifier::new("people", "3")).is_none());
    }

    #[test]
    fn outgoing_and_incoming() {
        let doc = document();
        let g = DocumentGraph::new(&doc);
        assert_eq!(ids(g.outgoing(&key("2"))), ["3"]);
        assert_eq!(ids(g.incoming(&key("1"))), ["3"]);
        assert!(g.outgoing(&key("missing")).is_empty());
    }

    #[test]
    fn reachable_terminates_on_cycles() {
        let doc = document();
        let g = DocumentGraph::new(&doc);
        assert_eq!(ids(g.reachable()), ["2", "3"]);
        assert_eq!(ids(g.unreachable()), ["4"]);
    }

    #[test]
    fn dangling_linkage_is_listed_once() {
        let doc = document();
        let g = DocumentGraph::new(&doc);
        assert_eq!(g.dangling(), [&key("9")]);
    }

    #[test]
    fn null_document_is_empty() {
        let doc = CompoundDocument::null();
        let g = DocumentGraph::new(&doc);
        assert!(g.is_empty());
        assert!(g.reachable().is_empty());
    }
}
