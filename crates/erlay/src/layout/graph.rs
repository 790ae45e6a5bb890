//! Relation graph construction.
//!
//! [`RelationGraphBuilder`] resolves the schema's relationships against the
//! entity list and produces a [`RelationGraph`]: the deduplicated directed
//! relations used for layering, the field-level edges used for crossing and
//! field ordering, adjacency queries, and the connectivity-driven processing
//! order that every later stage uses as its tie-breaker.

use std::{cmp::Reverse, collections::BTreeSet};

use indexmap::{IndexMap, IndexSet};

use erlay_core::schema::{Entity, Relationship};

use crate::{error::ErlayError, logger::LayoutLogger};

/// Log target of this stage.
pub const TARGET: &str = "erlay::graph";

/// Stable identifier of an entity: its index in the input entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A resolved, non-self relationship between two fields.
///
/// Field indices refer to the *input* field list of each entity; a field
/// name that does not exist on its entity resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEdge {
    from: EntityId,
    from_field: Option<usize>,
    to: EntityId,
    to_field: Option<usize>,
    from_is_primary_key: bool,
}

impl FieldEdge {
    pub fn from(&self) -> EntityId {
        self.from
    }

    pub fn to(&self) -> EntityId {
        self.to
    }

    pub fn from_field(&self) -> Option<usize> {
        self.from_field
    }

    pub fn to_field(&self) -> Option<usize> {
        self.to_field
    }

    /// Returns `true` when the relationship starts at a primary key field.
    pub fn from_is_primary_key(&self) -> bool {
        self.from_is_primary_key
    }

    /// Returns the endpoint opposite to `id` together with its field.
    ///
    /// `id` must be one of the two endpoints.
    pub fn opposite(&self, id: EntityId) -> (EntityId, Option<usize>) {
        if self.from == id {
            (self.to, self.to_field)
        } else {
            (self.from, self.from_field)
        }
    }

    /// Returns the field this edge attaches to on entity `id`.
    pub fn field_of(&self, id: EntityId) -> Option<usize> {
        if self.from == id {
            self.from_field
        } else {
            self.to_field
        }
    }
}

/// Adjacency lists of a single entity.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    parents: Vec<EntityId>,
    children: Vec<EntityId>,
    neighbors: Vec<EntityId>,
    edges: Vec<usize>,
}

/// The resolved relation graph of one layout pass.
#[derive(Debug)]
pub struct RelationGraph<'a> {
    entities: &'a [Entity],
    names: IndexMap<&'a str, EntityId>,
    relations: Vec<(EntityId, EntityId)>,
    edges: Vec<FieldEdge>,
    adjacency: Vec<Adjacency>,
    processing_order: Vec<EntityId>,
    rank: Vec<usize>,
}

impl<'a> RelationGraph<'a> {
    /// Returns the number of entities, connected or not.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over every entity id in input order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len()).map(EntityId)
    }

    pub fn entity(&self, id: EntityId) -> &'a Entity {
        &self.entities[id.0]
    }

    pub fn name(&self, id: EntityId) -> &'a str {
        self.entities[id.0].name()
    }

    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Deduplicated directed relations, first-seen direction kept.
    pub fn relations(&self) -> &[(EntityId, EntityId)] {
        &self.relations
    }

    /// Field-level edges, one per resolved non-self relationship.
    pub fn edges(&self) -> &[FieldEdge] {
        &self.edges
    }

    /// Left-hand sides of relations whose right-hand side is `id`.
    pub fn parents(&self, id: EntityId) -> &[EntityId] {
        &self.adjacency[id.0].parents
    }

    /// Right-hand sides of relations whose left-hand side is `id`.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        &self.adjacency[id.0].children
    }

    /// Entities related to `id` in either direction.
    pub fn neighbors(&self, id: EntityId) -> &[EntityId] {
        &self.adjacency[id.0].neighbors
    }

    /// Field edges incident to `id`.
    pub fn incident_edges(&self, id: EntityId) -> impl Iterator<Item = &FieldEdge> + '_ {
        self.adjacency[id.0]
            .edges
            .iter()
            .map(|&index| &self.edges[index])
    }

    /// Number of deduplicated relations `id` takes part in.
    pub fn connections(&self, id: EntityId) -> usize {
        self.adjacency[id.0].neighbors.len()
    }

    pub fn is_isolated(&self, id: EntityId) -> bool {
        self.adjacency[id.0].neighbors.is_empty()
    }

    /// Connected entities in processing order.
    pub fn processing_order(&self) -> &[EntityId] {
        &self.processing_order
    }

    /// Global tie-break rank: processing order first, then isolated
    /// entities in input order.
    pub fn rank(&self, id: EntityId) -> usize {
        self.rank[id.0]
    }
}

/// Builds a [`RelationGraph`] from a schema.
#[derive(Debug, Clone, Copy)]
pub struct RelationGraphBuilder<'l> {
    logger: LayoutLogger<'l>,
}

impl<'l> RelationGraphBuilder<'l> {
    pub fn new(logger: LayoutLogger<'l>) -> Self {
        Self {
            logger: logger.for_stage(TARGET),
        }
    }

    /// Resolve `relationships` against `entities`.
    ///
    /// Relationships naming an unknown entity are skipped. Self-references
    /// produce neither a relation nor a field edge.
    ///
    /// # Errors
    ///
    /// Returns [`ErlayError::DuplicateEntity`] if two entities share a name.
    pub fn build<'a>(
        &self,
        entities: &'a [Entity],
        relationships: &'a [Relationship],
    ) -> Result<RelationGraph<'a>, ErlayError> {
        let mut names = IndexMap::with_capacity(entities.len());
        for (index, entity) in entities.iter().enumerate() {
            if names.insert(entity.name(), EntityId(index)).is_some() {
                return Err(ErlayError::DuplicateEntity(entity.name().to_string()));
            }
        }

        let mut edges = Vec::with_capacity(relationships.len());
        let mut relations = Vec::new();
        let mut seen_pairs = IndexSet::new();

        for relationship in relationships {
            let (Some(&from), Some(&to)) = (
                names.get(relationship.from().entity()),
                names.get(relationship.to().entity()),
            ) else {
                self.logger.debug(format_args!(
                    "skipping relationship with unknown endpoint: {relationship}"
                ));
                continue;
            };

            if from == to {
                self.logger
                    .trace(format_args!("ignoring self reference: {relationship}"));
                continue;
            }

            let from_entity = &entities[from.0];
            let from_field = from_entity.field_index(relationship.from().field());
            let to_field = entities[to.0].field_index(relationship.to().field());

            edges.push(FieldEdge {
                from,
                from_field,
                to,
                to_field,
                from_is_primary_key: from_field
                    .is_some_and(|index| from_entity.fields()[index].is_primary_key()),
            });

            if seen_pairs.insert((from.min(to), from.max(to))) {
                relations.push((from, to));
            } else {
                self.logger.trace(format_args!(
                    "duplicate relation {} - {} merged",
                    from_entity.name(),
                    entities[to.0].name()
                ));
            }
        }

        let mut adjacency = vec![Adjacency::default(); entities.len()];
        for &(left, right) in &relations {
            adjacency[left.0].children.push(right);
            adjacency[left.0].neighbors.push(right);
            adjacency[right.0].parents.push(left);
            adjacency[right.0].neighbors.push(left);
        }
        for (index, edge) in edges.iter().enumerate() {
            adjacency[edge.from.0].edges.push(index);
            adjacency[edge.to.0].edges.push(index);
        }

        let processing_order = processing_order(&relations, &adjacency);

        let mut rank = vec![usize::MAX; entities.len()];
        for (position, id) in processing_order.iter().enumerate() {
            rank[id.0] = position;
        }
        let mut next_rank = processing_order.len();
        for slot in rank.iter_mut().filter(|slot| **slot == usize::MAX) {
            *slot = next_rank;
            next_rank += 1;
        }

        self.logger.debug(format_args!(
            "resolved {} entities, {} relations, {} field edges",
            entities.len(),
            relations.len(),
            edges.len()
        ));
        if self.logger.enabled(log::Level::Trace) {
            let order: Vec<&str> = processing_order
                .iter()
                .map(|id| entities[id.0].name())
                .collect();
            self.logger
                .trace(format_args!("processing order: {}", order.join(", ")));
        }

        Ok(RelationGraph {
            entities,
            names,
            relations,
            edges,
            adjacency,
            processing_order,
            rank,
        })
    }
}

/// Computes the connectivity-driven processing order.
///
/// Entities are ranked by connection count (descending, stable over
/// discovery order). The best-ranked entity seeds the order; afterwards the
/// best-ranked entity adjacent to anything already ordered comes next. An
/// empty frontier means a new component starts at its best-ranked entity.
fn processing_order(relations: &[(EntityId, EntityId)], adjacency: &[Adjacency]) -> Vec<EntityId> {
    let mut discovered = IndexSet::new();
    for &(left, right) in relations {
        discovered.insert(left);
        discovered.insert(right);
    }

    let mut ranking: Vec<EntityId> = discovered.into_iter().collect();
    ranking.sort_by_key(|id| Reverse(adjacency[id.0].neighbors.len()));

    let mut count_rank = vec![usize::MAX; adjacency.len()];
    for (position, id) in ranking.iter().enumerate() {
        count_rank[id.0] = position;
    }

    let mut ordered = vec![false; adjacency.len()];
    let mut order = Vec::with_capacity(ranking.len());
    let mut frontier = BTreeSet::new();
    let mut seed_cursor = 0;

    while order.len() < ranking.len() {
        let next = match frontier.pop_first() {
            Some(position) => ranking[position],
            None => {
                while ordered[ranking[seed_cursor].0] {
                    seed_cursor += 1;
                }
                ranking[seed_cursor]
            }
        };

        if ordered[next.0] {
            continue;
        }
        ordered[next.0] = true;
        order.push(next);

        for neighbor in &adjacency[next.0].neighbors {
            if !ordered[neighbor.0] {
                frontier.insert(count_rank[neighbor.0]);
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use erlay_core::schema::{Cardinality, Endpoint, Field};

    use super::*;

    fn entity(name: &str) -> Entity {
        Entity::new(
            name,
            vec![
                Field::new("id", "int").with_primary_key(true),
                Field::new("ref", "int").with_foreign_key(true),
            ],
        )
    }

    fn rel(from: &str, to: &str) -> Relationship {
        Relationship::new(
            Endpoint::new(from, "ref"),
            Endpoint::new(to, "id"),
            Cardinality::ManyToOne,
        )
    }

    fn names(graph: &RelationGraph<'_>, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|id| graph.name(*id).to_string()).collect()
    }

    #[test]
    fn test_dedup_keeps_first_direction() {
        let entities = vec![entity("a"), entity("b")];
        let relationships = vec![rel("a", "b"), rel("b", "a"), rel("a", "b")];

        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();

        assert_eq!(graph.relations(), &[(EntityId(0), EntityId(1))]);
        // Every resolved relationship is still a field edge.
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.connections(EntityId(0)), 1);
    }

    #[test]
    fn test_unknown_endpoints_and_self_references_are_skipped() {
        let entities = vec![entity("a"), entity("b")];
        let relationships = vec![rel("a", "ghost"), rel("a", "a"), rel("b", "a")];

        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();

        assert_eq!(graph.relations(), &[(EntityId(1), EntityId(0))]);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.parents(EntityId(0)), &[EntityId(1)]);
        assert_eq!(graph.children(EntityId(1)), &[EntityId(0)]);
    }

    #[test]
    fn test_duplicate_entity_is_rejected() {
        let entities = vec![entity("a"), entity("a")];
        let err = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &[])
            .unwrap_err();

        assert!(matches!(err, ErlayError::DuplicateEntity(name) if name == "a"));
    }

    #[test]
    fn test_processing_order_starts_at_hub() {
        // hub has three connections; leaf joins the frontier through mid and
        // outranks x and y by discovery order.
        let entities = vec![
            entity("leaf"),
            entity("mid"),
            entity("hub"),
            entity("x"),
            entity("y"),
        ];
        let relationships = vec![
            rel("leaf", "mid"),
            rel("mid", "hub"),
            rel("x", "hub"),
            rel("y", "hub"),
        ];

        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();

        assert_eq!(
            names(&graph, graph.processing_order()),
            vec!["hub", "mid", "leaf", "x", "y"]
        );
    }

    #[test]
    fn test_processing_order_covers_components_and_ranks_isolated_last() {
        let entities = vec![
            entity("lonely"),
            entity("a"),
            entity("b"),
            entity("c"),
            entity("d"),
        ];
        let relationships = vec![rel("a", "b"), rel("c", "d")];

        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();

        assert_eq!(names(&graph, graph.processing_order()), vec!["a", "b", "c", "d"]);
        assert!(graph.is_isolated(EntityId(0)));
        assert_eq!(graph.rank(EntityId(0)), 4);
        assert_eq!(graph.rank(EntityId(1)), 0);
    }

    #[test]
    fn test_primary_key_origin_is_recorded() {
        let entities = vec![entity("users"), entity("teams")];
        let relationships = vec![Relationship::new(
            Endpoint::new("users", "id"),
            Endpoint::new("teams", "id"),
            Cardinality::ManyToOne,
        )];

        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();

        let edge = graph.edges()[0];
        assert!(edge.from_is_primary_key());
        assert_eq!(edge.opposite(EntityId(1)), (EntityId(0), Some(0)));
        assert_eq!(edge.field_of(EntityId(1)), Some(0));
    }
}
