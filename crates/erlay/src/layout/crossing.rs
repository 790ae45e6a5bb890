//! Crossing counting and adjacent-swap refinement.
//!
//! Only edges between adjacent layers are counted. Two such edges between
//! the same pair of layers cross when the order of their left ends is the
//! inverse of the order of their right ends. Ends are compared by entity
//! position first and field position second, so two relationships between
//! the same pair of entities can cross too.

use std::time::{Duration, Instant};

use super::{
    fields::FieldOrder,
    graph::{EntityId, RelationGraph},
    layering::Layering,
};
use crate::logger::LayoutLogger;

/// Log target of this stage.
pub const TARGET: &str = "erlay::crossing";

/// Outcome of a refinement run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementReport {
    initial_crossings: usize,
    final_crossings: usize,
    iterations: usize,
    swaps: usize,
    /// Crossing count after each completed iteration.
    history: Vec<usize>,
}

impl RefinementReport {
    /// A report for a layout that was not refined.
    pub fn unrefined(crossings: usize) -> Self {
        Self {
            initial_crossings: crossings,
            final_crossings: crossings,
            ..Self::default()
        }
    }

    pub fn initial_crossings(&self) -> usize {
        self.initial_crossings
    }

    pub fn final_crossings(&self) -> usize {
        self.final_crossings
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn swaps(&self) -> usize {
        self.swaps
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }
}

/// One edge end: entity and field.
type End = (EntityId, Option<usize>);

/// Edges between layer `i` and `i + 1`, stored left end first.
#[derive(Debug, Clone, Default)]
struct Span {
    edges: Vec<(End, End)>,
}

impl Span {
    fn count(&self, positions: &[usize], fields: &FieldOrder) -> usize {
        let key = |(id, field): End| {
            (
                positions[id.index()],
                field.and_then(|field| fields.position(id, field)),
            )
        };
        let keys: Vec<_> = self
            .edges
            .iter()
            .map(|&(left, right)| (key(left), key(right)))
            .collect();

        let mut crossings = 0;
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    crossings += 1;
                }
            }
        }
        crossings
    }
}

fn spans(graph: &RelationGraph<'_>, layering: &Layering) -> Vec<Span> {
    let mut spans = vec![Span::default(); layering.len().saturating_sub(1)];
    for edge in graph.edges() {
        let from = (edge.from(), edge.from_field());
        let to = (edge.to(), edge.to_field());
        let (from_layer, to_layer) = (layering.layer_of(edge.from()), layering.layer_of(edge.to()));

        if to_layer == from_layer + 1 {
            spans[from_layer].edges.push((from, to));
        } else if from_layer == to_layer + 1 {
            spans[to_layer].edges.push((to, from));
        }
    }
    spans
}

/// Total crossings of `layering` with fields in `fields` order.
pub fn count_crossings(graph: &RelationGraph<'_>, layering: &Layering, fields: &FieldOrder) -> usize {
    let positions = layering.positions();
    spans(graph, layering)
        .iter()
        .map(|span| span.count(&positions, fields))
        .sum()
}

/// Bounded local search swapping vertically adjacent entities.
///
/// A swap is kept only if it strictly lowers the total crossing count, so
/// the count never increases and stopping early is always safe.
#[derive(Debug, Clone, Copy)]
pub struct CrossingRefiner<'l> {
    max_iterations: usize,
    budget: Option<Duration>,
    logger: LayoutLogger<'l>,
}

impl<'l> CrossingRefiner<'l> {
    pub fn new(max_iterations: usize, logger: LayoutLogger<'l>) -> Self {
        Self {
            max_iterations,
            budget: None,
            logger: logger.for_stage(TARGET),
        }
    }

    /// Stop once `budget` has elapsed, keeping the order reached so far.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    pub fn refine(
        &self,
        graph: &RelationGraph<'_>,
        layering: &mut Layering,
        fields: &FieldOrder,
    ) -> RefinementReport {
        let start = Instant::now();
        let spans = spans(graph, layering);
        let mut positions = layering.positions();
        let mut counts: Vec<usize> = spans
            .iter()
            .map(|span| span.count(&positions, fields))
            .collect();

        let initial = counts.iter().sum();
        let mut report = RefinementReport::unrefined(initial);
        let mut current = initial;

        for _ in 0..self.max_iterations {
            if current == 0 {
                break;
            }
            if self.budget.is_some_and(|budget| start.elapsed() >= budget) {
                self.logger
                    .debug(format_args!("budget exhausted after {} iterations", report.iterations));
                break;
            }

            let mut improved = false;
            for index in 0..layering.len() {
                // Only the spans touching this layer change when it is permuted.
                let touching: Vec<usize> = [index.checked_sub(1), Some(index)]
                    .into_iter()
                    .flatten()
                    .filter(|&span| span < spans.len())
                    .collect();

                for slot in 0..layering.layers()[index].len().saturating_sub(1) {
                    let before: usize = touching.iter().map(|&span| counts[span]).sum();

                    swap(layering, &mut positions, index, slot);
                    let after: Vec<usize> = touching
                        .iter()
                        .map(|&span| spans[span].count(&positions, fields))
                        .collect();
                    let after_total: usize = after.iter().sum();

                    if after_total < before {
                        for (&span, count) in touching.iter().zip(after) {
                            counts[span] = count;
                        }
                        current = current - before + after_total;
                        report.swaps += 1;
                        improved = true;
                    } else {
                        swap(layering, &mut positions, index, slot);
                    }
                }
            }

            report.iterations += 1;
            report.history.push(current);
            self.logger.trace(format_args!(
                "iteration {}: {current} crossings",
                report.iterations
            ));

            if !improved {
                break;
            }
        }

        report.final_crossings = current;
        self.logger.debug(format_args!(
            "crossings {initial} -> {current} with {} swaps",
            report.swaps
        ));
        report
    }
}

fn swap(layering: &mut Layering, positions: &mut [usize], index: usize, slot: usize) {
    let layer = &mut layering.layers_mut()[index];
    layer.swap(slot, slot + 1);
    positions[layer[slot].index()] = slot;
    positions[layer[slot + 1].index()] = slot + 1;
}

#[cfg(test)]
mod tests {
    use erlay_core::schema::{Cardinality, Endpoint, Entity, Field, Relationship};

    use super::*;
    use crate::layout::graph::RelationGraphBuilder;

    fn entity(name: &str, fields: &[&str]) -> Entity {
        Entity::new(
            name,
            fields.iter().map(|field| Field::new(*field, "int")).collect(),
        )
    }

    fn rel(from: (&str, &str), to: (&str, &str)) -> Relationship {
        Relationship::new(
            Endpoint::new(from.0, from.1),
            Endpoint::new(to.0, to.1),
            Cardinality::ManyToOne,
        )
    }

    fn id(index: usize) -> EntityId {
        EntityId::new(index)
    }

    #[test]
    fn test_entity_inversion_counts_as_crossing() {
        let entities = vec![
            entity("a", &["id"]),
            entity("b", &["id"]),
            entity("x", &["id"]),
            entity("y", &["id"]),
        ];
        let relationships = vec![rel(("a", "id"), ("x", "id")), rel(("b", "id"), ("y", "id"))];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let fields = FieldOrder::identity(&graph);

        let crossed = Layering::from_layers(vec![vec![id(0), id(1)], vec![id(3), id(2)]]);
        let straight = Layering::from_layers(vec![vec![id(0), id(1)], vec![id(2), id(3)]]);

        assert_eq!(count_crossings(&graph, &crossed, &fields), 1);
        assert_eq!(count_crossings(&graph, &straight, &fields), 0);
    }

    #[test]
    fn test_field_positions_break_ties() {
        let entities = vec![entity("a", &["id", "f1", "f2"]), entity("b", &["id", "g1", "g2"])];
        let relationships = vec![rel(("a", "f1"), ("b", "g2")), rel(("a", "f2"), ("b", "g1"))];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![vec![id(0)], vec![id(1)]]);

        assert_eq!(count_crossings(&graph, &layering, &FieldOrder::identity(&graph)), 1);
    }

    #[test]
    fn test_edges_spanning_several_layers_are_ignored() {
        let entities = vec![entity("a", &["id"]), entity("b", &["id"]), entity("c", &["id"])];
        let relationships = vec![rel(("a", "id"), ("c", "id"))];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![vec![id(0)], vec![id(1)], vec![id(2)]]);

        assert_eq!(count_crossings(&graph, &layering, &FieldOrder::identity(&graph)), 0);
    }

    #[test]
    fn test_refiner_removes_crossing() {
        let entities = vec![
            entity("a", &["id"]),
            entity("b", &["id"]),
            entity("x", &["id"]),
            entity("y", &["id"]),
        ];
        let relationships = vec![rel(("a", "id"), ("x", "id")), rel(("b", "id"), ("y", "id"))];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let fields = FieldOrder::identity(&graph);
        let mut layering = Layering::from_layers(vec![vec![id(0), id(1)], vec![id(3), id(2)]]);

        let report = CrossingRefiner::new(16, LayoutLogger::global()).refine(
            &graph,
            &mut layering,
            &fields,
        );

        assert_eq!(report.initial_crossings(), 1);
        assert_eq!(report.final_crossings(), 0);
        assert_eq!(report.swaps(), 1);
        assert_eq!(report.history(), &[0]);
        assert_eq!(count_crossings(&graph, &layering, &fields), 0);
        assert_eq!(layering.layer_of(id(0)), 0);
    }

    #[test]
    fn test_zero_budget_stops_immediately() {
        let entities = vec![
            entity("a", &["id"]),
            entity("b", &["id"]),
            entity("x", &["id"]),
            entity("y", &["id"]),
        ];
        let relationships = vec![rel(("a", "id"), ("x", "id")), rel(("b", "id"), ("y", "id"))];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let fields = FieldOrder::identity(&graph);
        let mut layering = Layering::from_layers(vec![vec![id(0), id(1)], vec![id(3), id(2)]]);

        let report = CrossingRefiner::new(16, LayoutLogger::global())
            .with_budget(Some(Duration::ZERO))
            .refine(&graph, &mut layering, &fields);

        assert_eq!(report.iterations(), 0);
        assert_eq!(report.final_crossings(), report.initial_crossings());
    }
}

#[cfg(test)]
mod proptest_tests {
    use erlay_core::schema::{Cardinality, Endpoint, Entity, Field, Relationship};
    use proptest::prelude::*;

    use super::*;
    use crate::layout::{graph::RelationGraphBuilder, layering::LayerAssigner};

    // ===================
    // Strategies
    // ===================

    /// Entities with three fields each and random relations between fields.
    fn schema_strategy() -> impl Strategy<Value = (Vec<Entity>, Vec<Relationship>)> {
        (3usize..10).prop_flat_map(|count| {
            prop::collection::vec((0..count, 0..3usize, 0..count, 0..3usize), 1..20).prop_map(
                move |links| {
                    let entities = (0..count)
                        .map(|index| {
                            Entity::new(
                                format!("e{index}"),
                                vec![
                                    Field::new("f0", "int").with_primary_key(true),
                                    Field::new("f1", "int"),
                                    Field::new("f2", "int"),
                                ],
                            )
                        })
                        .collect();
                    let relationships = links
                        .into_iter()
                        .map(|(from, from_field, to, to_field)| {
                            Relationship::new(
                                Endpoint::new(format!("e{from}"), format!("f{from_field}")),
                                Endpoint::new(format!("e{to}"), format!("f{to_field}")),
                                Cardinality::ManyToOne,
                            )
                        })
                        .collect();
                    (entities, relationships)
                },
            )
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Refinement never increases the crossing count and keeps layers intact.
    fn check_refinement_is_monotonic(
        entities: Vec<Entity>,
        relationships: Vec<Relationship>,
        max_iterations: usize,
    ) -> Result<(), TestCaseError> {
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let mut layering = LayerAssigner::new(LayoutLogger::global()).assign(&graph);
        let fields = FieldOrder::identity(&graph);
        let before = layering.clone();

        let report = CrossingRefiner::new(max_iterations, LayoutLogger::global()).refine(
            &graph,
            &mut layering,
            &fields,
        );

        prop_assert_eq!(
            report.initial_crossings(),
            count_crossings(&graph, &before, &fields)
        );
        prop_assert!(report.final_crossings() <= report.initial_crossings());
        prop_assert_eq!(
            report.final_crossings(),
            count_crossings(&graph, &layering, &fields)
        );
        prop_assert!(report.iterations() <= max_iterations);

        let mut previous = report.initial_crossings();
        for &count in report.history() {
            prop_assert!(count <= previous);
            previous = count;
        }

        for id in graph.ids() {
            prop_assert_eq!(layering.layer_of(id), before.layer_of(id));
        }
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn refinement_is_monotonic(
            (entities, relationships) in schema_strategy(),
            max_iterations in 0usize..20,
        ) {
            check_refinement_is_monotonic(entities, relationships, max_iterations)?;
        }
    }
}
