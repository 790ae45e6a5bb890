//! Field ordering.
//!
//! Each entity's field list is reordered so that fields taking part in a
//! relationship sit near the vertical position of whatever they connect to.
//! Primary keys always come first and unconnected fields last. The entity
//! values themselves are never touched: the result is a [`FieldOrder`], a
//! permutation per entity, from which reordered entity copies are built.

use super::{
    engines::FieldOrdering,
    graph::{EntityId, RelationGraph},
    layering::Layering,
};
use crate::logger::LayoutLogger;

/// Log target of this stage.
pub const TARGET: &str = "erlay::fields";

/// Passes allowed beyond the configured ones while field lists keep changing.
pub const MAX_SETTLE_PASSES: usize = 16;

/// Display order of every entity's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrder {
    /// Per entity: input field indices in display order.
    orders: Vec<Vec<usize>>,
    /// Per entity: display position of each input field.
    positions: Vec<Vec<usize>>,
}

impl FieldOrder {
    /// The order in which fields were given.
    pub fn identity(graph: &RelationGraph<'_>) -> Self {
        let orders: Vec<Vec<usize>> = graph
            .ids()
            .map(|id| (0..graph.entity(id).fields().len()).collect())
            .collect();
        let positions = orders.clone();
        Self { orders, positions }
    }

    /// Input field indices of `id` in display order.
    pub fn order(&self, id: EntityId) -> &[usize] {
        &self.orders[id.index()]
    }

    /// Display position of input field `field` of `id`.
    pub fn position(&self, id: EntityId, field: usize) -> Option<usize> {
        self.positions[id.index()].get(field).copied()
    }

    pub fn field_count(&self, id: EntityId) -> usize {
        self.orders[id.index()].len()
    }

    fn set(&mut self, id: EntityId, order: Vec<usize>) {
        let positions = &mut self.positions[id.index()];
        for (position, &field) in order.iter().enumerate() {
            positions[field] = position;
        }
        self.orders[id.index()] = order;
    }
}

/// What a field ordering strategy knows about one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSlot {
    field: usize,
    primary_key: bool,
    barycenter: Option<f64>,
}

impl FieldSlot {
    pub fn new(field: usize, primary_key: bool, barycenter: Option<f64>) -> Self {
        Self {
            field,
            primary_key,
            barycenter,
        }
    }

    /// Input index of the field.
    pub fn field(&self) -> usize {
        self.field
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Mean position of what the field connects to, `None` when unconnected.
    pub fn barycenter(&self) -> Option<f64> {
        self.barycenter
    }

    fn class(&self) -> u8 {
        match (self.primary_key, self.barycenter) {
            (true, _) => 0,
            (false, Some(_)) => 1,
            (false, None) => 2,
        }
    }
}

/// Primary keys first, connected fields by barycenter, then unconnected
/// fields. Ties keep the current order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarycenterFields;

impl FieldOrdering for BarycenterFields {
    fn arrange(&self, slots: &[FieldSlot]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..slots.len()).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (&slots[a], &slots[b]);
            a.class().cmp(&b.class()).then_with(|| match (a.barycenter, b.barycenter) {
                (Some(x), Some(y)) if a.class() == 1 => x.total_cmp(&y),
                _ => std::cmp::Ordering::Equal,
            })
        });
        order
    }
}

/// Primary keys first, then connected fields spread evenly over the
/// remaining positions in barycenter order, gaps filled by unconnected
/// fields in their current order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispersalFields;

impl FieldOrdering for DispersalFields {
    fn arrange(&self, slots: &[FieldSlot]) -> Vec<usize> {
        let primary = (0..slots.len()).filter(|&i| slots[i].primary_key);
        let rest: Vec<usize> = (0..slots.len()).filter(|&i| !slots[i].primary_key).collect();

        let mut connected: Vec<usize> = rest
            .iter()
            .copied()
            .filter(|&i| slots[i].barycenter.is_some())
            .collect();
        if connected.len() < 2 {
            return BarycenterFields.arrange(slots);
        }
        connected.sort_by(|&a, &b| {
            let (x, y) = (slots[a].barycenter, slots[b].barycenter);
            x.unwrap_or(f64::INFINITY)
                .total_cmp(&y.unwrap_or(f64::INFINITY))
        });

        let span = rest.len() - 1;
        let steps = connected.len() - 1;
        let mut placed = vec![None; rest.len()];
        for (i, &slot) in connected.iter().enumerate() {
            // round(i * span / steps) in integers; the spacing is at least
            // one so targets never collide.
            let target = (2 * i * span + steps) / (2 * steps);
            placed[target] = Some(slot);
        }

        let mut unconnected = rest
            .iter()
            .copied()
            .filter(|&i| slots[i].barycenter.is_none());
        for gap in placed.iter_mut().filter(|gap| gap.is_none()) {
            *gap = unconnected.next();
        }

        primary.chain(placed.into_iter().flatten()).collect()
    }
}

/// Runs a [`FieldOrdering`] over every entity, layer by layer.
pub struct FieldOrderer<'e, 'l> {
    strategy: &'e dyn FieldOrdering,
    passes: usize,
    logger: LayoutLogger<'l>,
}

impl<'e, 'l> FieldOrderer<'e, 'l> {
    pub fn new(strategy: &'e dyn FieldOrdering, passes: usize, logger: LayoutLogger<'l>) -> Self {
        Self {
            strategy,
            passes,
            logger: logger.for_stage(TARGET),
        }
    }

    /// Reorder fields starting from `order`.
    ///
    /// Each pass visits layers left to right and then right to left, so
    /// every entity sees the updated order of its neighbors. Passing stops
    /// as soon as a pass changes nothing. If the configured passes are used
    /// up while fields still move, up to [`MAX_SETTLE_PASSES`] more are run;
    /// an order that still has not settled then is kept as is. Zero passes
    /// keeps `order` unchanged.
    pub fn order(
        &self,
        graph: &RelationGraph<'_>,
        layering: &Layering,
        mut order: FieldOrder,
    ) -> FieldOrder {
        if self.passes == 0 {
            return order;
        }

        let positions = layering.positions();
        let layers = layering.layers();
        let limit = self.passes + MAX_SETTLE_PASSES;

        let mut settled = false;
        let mut passes = 0;
        while passes < limit {
            let mut changed = 0;
            let sweep = layers.iter().chain(layers.iter().rev());
            for layer in sweep {
                for &id in layer {
                    if self.reorder_entity(graph, &positions, &mut order, id) {
                        changed += 1;
                    }
                }
            }
            passes += 1;
            self.logger
                .trace(format_args!("pass {passes}: {changed} field lists changed"));
            if changed == 0 {
                settled = true;
                break;
            }
        }

        if settled {
            self.logger.debug(format_args!(
                "ordered fields of {} entities in {passes} passes",
                graph.len()
            ));
        } else {
            self.logger.debug(format_args!(
                "field order of {} entities still changing after {passes} passes",
                graph.len()
            ));
        }
        order
    }

    /// Returns `true` if the field order of `id` changed.
    fn reorder_entity(
        &self,
        graph: &RelationGraph<'_>,
        positions: &[usize],
        order: &mut FieldOrder,
        id: EntityId,
    ) -> bool {
        let fields = graph.entity(id).fields();
        let slots: Vec<FieldSlot> = order
            .order(id)
            .iter()
            .map(|&field| {
                FieldSlot::new(
                    field,
                    fields[field].is_primary_key(),
                    barycenter(graph, positions, order, id, field),
                )
            })
            .collect();

        let arrangement = self.strategy.arrange(&slots);
        if !is_permutation(&arrangement, slots.len()) {
            self.logger.debug(format_args!(
                "ignoring invalid field arrangement for {}",
                graph.name(id)
            ));
            return false;
        }

        let new_order: Vec<usize> = arrangement.iter().map(|&i| slots[i].field).collect();
        if new_order == order.order(id) {
            return false;
        }
        order.set(id, new_order);
        true
    }
}

/// Mean position of the remote ends of every edge attached to `field`.
///
/// A remote end at layer position `p` on field `f` of `n` fields counts as
/// `p + f / n`.
fn barycenter(
    graph: &RelationGraph<'_>,
    positions: &[usize],
    order: &FieldOrder,
    id: EntityId,
    field: usize,
) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for edge in graph.incident_edges(id) {
        if edge.field_of(id) != Some(field) {
            continue;
        }
        let (remote, remote_field) = edge.opposite(id);
        let field_count = order.field_count(remote);
        let fraction = match remote_field.and_then(|f| order.position(remote, f)) {
            Some(position) if field_count > 0 => position as f64 / field_count as f64,
            _ => 0.0,
        };
        sum += positions[remote.index()] as f64 + fraction;
        count += 1;
    }

    (count > 0).then(|| sum / count as f64)
}

fn is_permutation(arrangement: &[usize], len: usize) -> bool {
    if arrangement.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    arrangement
        .iter()
        .all(|&i| i < len && !std::mem::replace(&mut seen[i], true))
}

#[cfg(test)]
mod tests {
    use erlay_core::schema::{Cardinality, Endpoint, Entity, Field, Relationship};

    use super::*;
    use crate::layout::graph::RelationGraphBuilder;

    fn slot(field: usize, primary_key: bool, barycenter: Option<f64>) -> FieldSlot {
        FieldSlot::new(field, primary_key, barycenter)
    }

    #[test]
    fn test_barycenter_pins_keys_and_sinks_unconnected() {
        let slots = [
            slot(0, false, None),
            slot(1, true, None),
            slot(2, false, Some(2.0)),
            slot(3, false, Some(0.5)),
        ];

        assert_eq!(BarycenterFields.arrange(&slots), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_barycenter_fixed_point() {
        let slots = [
            slot(0, true, Some(3.0)),
            slot(1, false, Some(0.5)),
            slot(2, false, Some(0.5)),
            slot(3, false, Some(1.0)),
            slot(4, false, None),
        ];

        assert_eq!(BarycenterFields.arrange(&slots), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dispersal_spreads_connected_fields() {
        let slots = [
            slot(0, true, None),
            slot(1, false, Some(0.3)),
            slot(2, false, Some(0.1)),
            slot(3, false, Some(0.2)),
            slot(4, false, None),
            slot(5, false, None),
        ];

        // Five non-key positions, three connected fields: targets 0, 2, 4.
        assert_eq!(DispersalFields.arrange(&slots), vec![0, 2, 4, 3, 5, 1]);
    }

    #[test]
    fn test_dispersal_with_one_connection_matches_barycenter() {
        let slots = [
            slot(0, false, None),
            slot(1, false, Some(1.0)),
            slot(2, true, None),
        ];

        assert_eq!(
            DispersalFields.arrange(&slots),
            BarycenterFields.arrange(&slots)
        );
    }

    #[test]
    fn test_orderer_aligns_fields_and_reaches_fixed_point() {
        let entities = vec![
            Entity::new(
                "posts",
                vec![
                    Field::new("title", "text"),
                    Field::new("authorId", "int"),
                    Field::new("id", "int").with_primary_key(true),
                    Field::new("categoryId", "int"),
                ],
            ),
            Entity::new("users", vec![Field::new("id", "int").with_primary_key(true)]),
            Entity::new(
                "categories",
                vec![Field::new("id", "int").with_primary_key(true)],
            ),
        ];
        let relationships = vec![
            Relationship::new(
                Endpoint::new("posts", "authorId"),
                Endpoint::new("users", "id"),
                Cardinality::ManyToOne,
            ),
            Relationship::new(
                Endpoint::new("posts", "categoryId"),
                Endpoint::new("categories", "id"),
                Cardinality::ManyToOne,
            ),
        ];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![
            vec![EntityId::new(0)],
            vec![EntityId::new(2), EntityId::new(1)],
        ]);

        let orderer = FieldOrderer::new(&BarycenterFields, 2, LayoutLogger::global());
        let first = orderer.order(&graph, &layering, FieldOrder::identity(&graph));
        let posts: Vec<&str> = first
            .order(EntityId::new(0))
            .iter()
            .map(|&f| entities[0].fields()[f].name())
            .collect();
        assert_eq!(posts, vec!["id", "categoryId", "authorId", "title"]);
        assert_eq!(first.position(EntityId::new(0), 0), Some(3));

        let second = orderer.order(&graph, &layering, first.clone());
        assert_eq!(second, first);
    }

    #[test]
    fn test_orderer_keeps_going_until_fields_settle() {
        // One pass leaves `right` at [r0, r2, r1]; the order only settles
        // after `left` has moved and `right` has been revisited.
        let entities = vec![
            Entity::new(
                "left",
                (0..4).map(|i| Field::new(format!("l{i}"), "int")).collect(),
            ),
            Entity::new(
                "right",
                (0..3).map(|i| Field::new(format!("r{i}"), "int")).collect(),
            ),
        ];
        let pairs = [
            ("l0", "r0"),
            ("l0", "r2"),
            ("l1", "r1"),
            ("l3", "r0"),
            ("l2", "r1"),
            ("l3", "r1"),
        ];
        let relationships = pairs
            .iter()
            .map(|(from, to)| {
                Relationship::new(
                    Endpoint::new("left", *from),
                    Endpoint::new("right", *to),
                    Cardinality::ManyToOne,
                )
            })
            .collect::<Vec<_>>();
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![vec![EntityId::new(0)], vec![EntityId::new(1)]]);

        let orderer = FieldOrderer::new(&BarycenterFields, 1, LayoutLogger::global());
        let first = orderer.order(&graph, &layering, FieldOrder::identity(&graph));

        assert_eq!(first.order(EntityId::new(0)), &[0, 3, 1, 2]);
        assert_eq!(first.order(EntityId::new(1)), &[2, 0, 1]);

        let second = orderer.order(&graph, &layering, first.clone());
        assert_eq!(second, first);
    }

    #[test]
    fn test_zero_passes_keeps_input_order() {
        let entities = vec![
            Entity::new("a", vec![Field::new("x", "int"), Field::new("y", "int")]),
            Entity::new("b", vec![Field::new("id", "int").with_primary_key(true)]),
        ];
        let relationships = vec![Relationship::new(
            Endpoint::new("a", "y"),
            Endpoint::new("b", "id"),
            Cardinality::ManyToOne,
        )];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![vec![EntityId::new(0)], vec![EntityId::new(1)]]);

        let order = FieldOrderer::new(&BarycenterFields, 0, LayoutLogger::global()).order(
            &graph,
            &layering,
            FieldOrder::identity(&graph),
        );
        assert_eq!(order, FieldOrder::identity(&graph));
    }

    #[test]
    fn test_invalid_arrangement_is_ignored() {
        struct Broken;
        impl FieldOrdering for Broken {
            fn arrange(&self, slots: &[FieldSlot]) -> Vec<usize> {
                vec![0; slots.len()]
            }
        }

        let entities = vec![
            Entity::new("a", vec![Field::new("x", "int"), Field::new("y", "int")]),
            Entity::new("b", vec![Field::new("id", "int")]),
        ];
        let relationships = vec![Relationship::new(
            Endpoint::new("a", "y"),
            Endpoint::new("b", "id"),
            Cardinality::ManyToOne,
        )];
        let graph = RelationGraphBuilder::new(LayoutLogger::global())
            .build(&entities, &relationships)
            .unwrap();
        let layering = Layering::from_layers(vec![vec![EntityId::new(0)], vec![EntityId::new(1)]]);

        let order = FieldOrderer::new(&Broken, 2, LayoutLogger::global()).order(
            &graph,
            &layering,
            FieldOrder::identity(&graph),
        );
        assert_eq!(order, FieldOrder::identity(&graph));
    }
}
