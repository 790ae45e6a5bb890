//! Vertical ordering of entities within their layers.
//!
//! Both strategies run weighted-barycenter sweeps: a forward pass orders
//! layer `i` by the mean position of each entity's neighbors in layer
//! `i - 1`, a backward pass mirrors this with layer `i + 1`. A connection
//! whose relationship starts at a primary key weighs
//! [`PRIMARY_KEY_WEIGHT`], every other connection weighs 1.
//!
//! [`Clustered`] additionally keeps entities that share the exact same set
//! of reference-layer neighbors next to each other. In a backward pass this
//! keeps a cluster (siblings sharing one target) together; in a forward pass
//! it keeps a source chain together.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::{
    engines::VerticalOrdering,
    graph::{EntityId, RelationGraph},
    layering::Layering,
};
use crate::logger::LayoutLogger;

/// Log target of this stage.
pub const TARGET: &str = "erlay::ordering";

/// Weight of a connection whose relationship starts at a primary key.
pub const PRIMARY_KEY_WEIGHT: f64 = 0.3;

/// Plain weighted-barycenter sweeps.
#[derive(Debug, Clone, Copy)]
pub struct Barycenter {
    passes: usize,
}

impl Barycenter {
    pub fn new(passes: usize) -> Self {
        Self { passes }
    }
}

impl VerticalOrdering for Barycenter {
    fn order(&self, graph: &RelationGraph<'_>, layering: &mut Layering, logger: LayoutLogger<'_>) {
        sweep(graph, layering, self.passes, false, logger.for_stage(TARGET));
    }
}

/// Weighted-barycenter sweeps that keep clusters and source chains contiguous.
#[derive(Debug, Clone, Copy)]
pub struct Clustered {
    passes: usize,
}

impl Clustered {
    pub fn new(passes: usize) -> Self {
        Self { passes }
    }
}

impl VerticalOrdering for Clustered {
    fn order(&self, graph: &RelationGraph<'_>, layering: &mut Layering, logger: LayoutLogger<'_>) {
        sweep(graph, layering, self.passes, true, logger.for_stage(TARGET));
    }
}

/// Sort key of one entity for a single reorder step.
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    id: EntityId,
    barycenter: f64,
    rank: usize,
    /// Distinct neighbors in the reference layer, sorted.
    anchors: Vec<EntityId>,
}

impl Entry {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.barycenter
            .total_cmp(&other.barycenter)
            .then(self.rank.cmp(&other.rank))
    }
}

/// Contiguity group of the clustered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    /// An entity without reference-layer neighbors stands alone.
    Single(EntityId),
    Shared(Vec<EntityId>),
}

fn sweep(
    graph: &RelationGraph<'_>,
    layering: &mut Layering,
    passes: usize,
    clustered: bool,
    logger: LayoutLogger<'_>,
) {
    let layer_count = layering.len();
    if layer_count < 2 {
        logger.trace(format_args!("single layer, keeping seed order"));
        return;
    }

    let mut positions = layering.positions();

    for pass in 0..passes {
        for index in 1..layer_count {
            reorder_layer(graph, layering, &mut positions, index, index - 1, clustered);
        }
        for index in (0..layer_count - 1).rev() {
            reorder_layer(graph, layering, &mut positions, index, index + 1, clustered);
        }
        logger.trace(format_args!("finished sweep {}", pass + 1));
    }

    logger.debug(format_args!(
        "ordered {layer_count} layers with {passes} sweeps{}",
        if clustered { " (clustered)" } else { "" }
    ));
}

/// Reorders layer `index` against the fixed layer `reference`.
fn reorder_layer(
    graph: &RelationGraph<'_>,
    layering: &mut Layering,
    positions: &mut [usize],
    index: usize,
    reference: usize,
    clustered: bool,
) {
    let entries: Vec<Entry> = layering.layers()[index]
        .iter()
        .map(|&id| entry(graph, layering, positions, id, reference))
        .collect();

    let order = arrange(entries, clustered);

    for (position, &id) in order.iter().enumerate() {
        positions[id.index()] = position;
    }
    layering.layers_mut()[index] = order;
}

fn entry(
    graph: &RelationGraph<'_>,
    layering: &Layering,
    positions: &[usize],
    id: EntityId,
    reference: usize,
) -> Entry {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut anchors = Vec::new();

    for edge in graph.incident_edges(id) {
        let (other, _) = edge.opposite(id);
        if layering.layer_of(other) != reference {
            continue;
        }
        let weight = if edge.from_is_primary_key() {
            PRIMARY_KEY_WEIGHT
        } else {
            1.0
        };
        weighted += weight * positions[other.index()] as f64;
        total_weight += weight;
        anchors.push(other);
    }

    anchors.sort_unstable();
    anchors.dedup();

    Entry {
        id,
        // Entities with nothing to align to sink to the bottom.
        barycenter: if total_weight > 0.0 {
            weighted / total_weight
        } else {
            f64::INFINITY
        },
        rank: graph.rank(id),
        anchors,
    }
}

/// Produces the new order of a layer from its entries.
fn arrange(mut entries: Vec<Entry>, clustered: bool) -> Vec<EntityId> {
    if !clustered {
        entries.sort_by(Entry::cmp_key);
        return entries.into_iter().map(|entry| entry.id).collect();
    }

    let mut groups: IndexMap<GroupKey, Vec<Entry>> = IndexMap::new();
    for entry in entries {
        let key = if entry.anchors.is_empty() {
            GroupKey::Single(entry.id)
        } else {
            GroupKey::Shared(entry.anchors.clone())
        };
        groups.entry(key).or_default().push(entry);
    }

    let mut groups: Vec<Vec<Entry>> = groups
        .into_values()
        .map(|mut members| {
            members.sort_by(Entry::cmp_key);
            members
        })
        .collect();
    // A group goes where its best member would sort.
    groups.sort_by(|a, b| a[0].cmp_key(&b[0]));

    groups
        .into_iter()
        .flatten()
        .map(|entry| entry.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use erlay_core::schema::{Cardinality, Endpoint, Entity, Field, Relationship};

    use super::*;
    use crate::layout::graph::RelationGraphBuilder;

    fn entry(id: usize, barycenter: f64, rank: usize, anchors: &[usize]) -> Entry {
        Entry {
            id: EntityId::new(id),
            barycenter,
            rank,
            anchors: anchors.iter().map(|&a| EntityId::new(a)).collect(),
        }
    }

    fn ids(order: &[EntityId]) -> Vec<usize> {
        order.iter().map(|id| id.index()).collect()
    }

    fn entity(name: &str) -> Entity {
        Entity::new(
            name,
            vec![
                Field::new("id", "int").with_primary_key(true),
                Field::new("ref", "int"),
            ],
        )
    }

    fn rel(from: &str, from_field: &str, to: &str) -> Relationship {
        Relationship::new(
            Endpoint::new(from, from_field),
            Endpoint::new(to, "id"),
            Cardinality::ManyToOne,
        )
    }

    #[test]
    fn test_plain_arrange_sorts_by_barycenter_then_rank() {
        let entries = vec![
            entry(0, 1.0, 3, &[]),
            entry(1, f64::INFINITY, 0, &[]),
            entry(2, 0.5, 4, &[]),
            entry(3, 1.0, 1, &[]),
        ];

        assert_eq!(ids(&arrange(entries, false)), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_clustered_arrange_keeps_shared_neighbors_together() {
        // 0 and 2 share anchors {7, 8}; plain sorting would put 1 between them.
        let entries = vec![
            entry(0, 1.0, 0, &[7, 8]),
            entry(1, 1.0, 1, &[9]),
            entry(2, 1.0, 2, &[7, 8]),
        ];

        assert_eq!(ids(&arrange(entries.clone(), false)), vec![0, 1, 2]);
        assert_eq!(ids(&arrange(entries, true)), vec![0, 2, 1]);
    }

    #[test]
    fn test_unanchored_entities_are_not_grouped() {
        let entries = vec![
            entry(0, f64::INFINITY, 2, &[]),
            entry(1, 0.0, 1, &[5]),
            entry(2, f64::INFINITY, 0, &[]),
        ];

        assert_eq!(ids(&arrange(entries, true)), vec![1, 2, 0]);
    }

    #[test]
    fn test_primary_key_connections_weigh_less() {
        // `hub` (layer 1) connects to `low` at position 0 through a primary
        // key and to `high` at position 1 through a plain field, so its
        // barycenter leans towards `high`.
        let entities = vec![entity("low"), entity("high"), entity("hub")];
        let relationships = vec![rel("low", "id", "hub"), rel("high", "ref", "hub")];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![
            vec![EntityId::new(0), EntityId::new(1)],
            vec![EntityId::new(2)],
        ]);
        let positions = layering.positions();

        let hub = super::entry(&graph, &layering, &positions, EntityId::new(2), 0);

        assert!((hub.barycenter - 1.0 / 1.3).abs() < 1e-9);
        assert_eq!(hub.anchors, vec![EntityId::new(0), EntityId::new(1)]);
    }

    #[test]
    fn test_sweeps_untangle_two_edges() {
        let entities = vec![entity("a"), entity("b"), entity("x"), entity("y")];
        let relationships = vec![rel("a", "ref", "x"), rel("b", "ref", "y")];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let (a, b, x, y) = (
            EntityId::new(0),
            EntityId::new(1),
            EntityId::new(2),
            EntityId::new(3),
        );

        for strategy in [
            &Barycenter::new(4) as &dyn VerticalOrdering,
            &Clustered::new(4) as &dyn VerticalOrdering,
        ] {
            let mut layering = Layering::from_layers(vec![vec![a, b], vec![y, x]]);
            strategy.order(&graph, &mut layering, LayoutLogger::global());

            let positions = layering.positions();
            assert_eq!(
                positions[a.index()] < positions[b.index()],
                positions[x.index()] < positions[y.index()]
            );
            assert_eq!(layering.layer_of(a), 0);
            assert_eq!(layering.layer_of(y), 1);
        }
    }
}
