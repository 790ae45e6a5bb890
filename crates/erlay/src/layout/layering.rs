//! Layer assignment.
//!
//! [`LayerAssigner`] gives every entity an integer layer such that:
//!
//! - directly related entities never share a layer,
//! - the left-hand side of a relation is placed left of its right-hand side
//!   unless the relation lies on a cycle,
//! - every entity sits at the lowest layer the above permits.
//!
//! Layers are kept in an explicit [`LayerTable`] addressed by [`EntityId`].
//! Inserting a new leftmost layer and cascading a subtree to the right are
//! table updates. After placement, a repair sweep fixes the equal-layer and
//! leftward pairs a cascade can leave behind, empty layers are
//! compacted away, isolated entities get a trailing layer, and every layer is
//! given a seed order for the vertical ordering stage.

use std::collections::VecDeque;

use indexmap::IndexSet;

use super::graph::{EntityId, RelationGraph};
use crate::logger::LayoutLogger;

/// Log target of this stage.
pub const TARGET: &str = "erlay::layering";

/// Mapping from entity to layer index under construction.
#[derive(Debug, Clone)]
pub struct LayerTable {
    layers: Vec<Option<usize>>,
}

impl LayerTable {
    /// Create a table with `len` unplaced entities.
    pub fn new(len: usize) -> Self {
        Self {
            layers: vec![None; len],
        }
    }

    pub fn get(&self, id: EntityId) -> Option<usize> {
        self.layers[id.index()]
    }

    pub fn set(&mut self, id: EntityId, layer: usize) {
        self.layers[id.index()] = Some(layer);
    }

    pub fn is_placed(&self, id: EntityId) -> bool {
        self.layers[id.index()].is_some()
    }

    /// Moves every placed entity `delta` layers to the right.
    pub fn shift_all(&mut self, delta: usize) {
        for layer in self.layers.iter_mut().flatten() {
            *layer += delta;
        }
    }

    /// Returns `true` if placing `id` at `layer` would put it next to one of
    /// its neighbors.
    pub fn conflicts(&self, graph: &RelationGraph<'_>, id: EntityId, layer: usize) -> bool {
        graph
            .neighbors(id)
            .iter()
            .any(|&neighbor| neighbor != id && self.get(neighbor) == Some(layer))
    }

    /// Returns the first layer `>= from` that does not conflict for `id`.
    fn first_free_from(&self, graph: &RelationGraph<'_>, id: EntityId, from: usize) -> usize {
        (from..)
            .find(|&layer| !self.conflicts(graph, id, layer))
            .unwrap_or(from)
    }
}

/// The final layering: a layer index per entity and ordered layer lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layering {
    layer_of: Vec<usize>,
    layers: Vec<Vec<EntityId>>,
}

impl Layering {
    /// Build a layering from ordered layer lists.
    ///
    /// Every entity id must appear exactly once.
    pub fn from_layers(layers: Vec<Vec<EntityId>>) -> Self {
        let len = layers.iter().map(Vec::len).sum();
        let mut layer_of = vec![0; len];
        for (index, layer) in layers.iter().enumerate() {
            for id in layer {
                layer_of[id.index()] = index;
            }
        }
        Self { layer_of, layers }
    }

    pub fn layer_of(&self, id: EntityId) -> usize {
        self.layer_of[id.index()]
    }

    pub fn layers(&self) -> &[Vec<EntityId>] {
        &self.layers
    }

    /// Mutable access to the layer lists for reordering.
    ///
    /// Entities may be permuted within a layer but never moved between layers.
    pub fn layers_mut(&mut self) -> &mut [Vec<EntityId>] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the position of every entity within its layer, indexed by id.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.layer_of.len()];
        for layer in &self.layers {
            for (position, id) in layer.iter().enumerate() {
                positions[id.index()] = position;
            }
        }
        positions
    }
}

/// Assigns layers to the entities of a [`RelationGraph`].
#[derive(Debug, Clone, Copy)]
pub struct LayerAssigner<'l> {
    logger: LayoutLogger<'l>,
}

impl<'l> LayerAssigner<'l> {
    pub fn new(logger: LayoutLogger<'l>) -> Self {
        Self {
            logger: logger.for_stage(TARGET),
        }
    }

    /// Compute the layering of `graph`.
    pub fn assign(&self, graph: &RelationGraph<'_>) -> Layering {
        let mut table = LayerTable::new(graph.len());

        for &id in graph.processing_order() {
            self.place(graph, &mut table, id);
        }

        self.repair(graph, &mut table);

        let mut layers = compact(graph, &table);

        let unplaced: Vec<EntityId> = graph.ids().filter(|&id| !table.is_placed(id)).collect();
        if !unplaced.is_empty() {
            self.logger.debug(format_args!(
                "{} unconnected entities go to trailing layer {}",
                unplaced.len(),
                layers.len()
            ));
            layers.push(unplaced);
        }

        seed_order(graph, &mut layers);

        if self.logger.enabled(log::Level::Debug) {
            for (index, layer) in layers.iter().enumerate() {
                let names: Vec<&str> = layer.iter().map(|&id| graph.name(id)).collect();
                self.logger
                    .debug(format_args!("layer {index}: {}", names.join(", ")));
            }
        }

        Layering::from_layers(layers)
    }

    /// Places `id` after making sure all of its parents are placed.
    fn place(&self, graph: &RelationGraph<'_>, table: &mut LayerTable, id: EntityId) {
        for &parent in graph.parents(id) {
            if table.is_placed(parent) {
                continue;
            }

            // The parent should land directly left of where `id` must go,
            // which is one past the rightmost parent placed so far.
            let preferred = max_parent_layer(graph, table, id).unwrap_or(0);
            match (0..=preferred)
                .rev()
                .find(|&layer| !table.conflicts(graph, parent, layer))
            {
                Some(layer) => {
                    table.set(parent, layer);
                    self.logger.trace(format_args!(
                        "parent {} placed at layer {layer}",
                        graph.name(parent)
                    ));
                }
                None => {
                    table.shift_all(1);
                    table.set(parent, 0);
                    self.logger.trace(format_args!(
                        "parent {} placed at new layer 0",
                        graph.name(parent)
                    ));
                }
            }
        }

        let required = max_parent_layer(graph, table, id).map_or(0, |layer| layer + 1);

        match table.get(id) {
            None => {
                let layer = table.first_free_from(graph, id, required);
                table.set(id, layer);
                self.logger
                    .trace(format_args!("{} placed at layer {layer}", graph.name(id)));
            }
            Some(current) if current < required => {
                self.cascade(graph, table, id, required - current);
            }
            Some(_) => {}
        }
    }

    /// Shifts `id`, its placed descendants, and the descendants' other
    /// placed parents `delta` layers to the right.
    fn cascade(&self, graph: &RelationGraph<'_>, table: &mut LayerTable, id: EntityId, delta: usize) {
        let own_parents = graph.parents(id);

        let mut moving = IndexSet::new();
        moving.insert(id);

        for descendant in descendants(graph, id) {
            if !table.is_placed(descendant) {
                continue;
            }
            moving.insert(descendant);
            for &parent in graph.parents(descendant) {
                if table.is_placed(parent) && !own_parents.contains(&parent) {
                    moving.insert(parent);
                }
            }
        }

        self.logger.debug(format_args!(
            "cascading {} entities by {delta} layers from {}",
            moving.len(),
            graph.name(id)
        ));

        for &moved in &moving {
            if let Some(layer) = table.get(moved) {
                table.set(moved, layer + delta);
            }
        }
    }

    /// Fixes the relations a cascade left behind.
    ///
    /// A relation whose endpoints share a layer, or that points leftwards
    /// without lying on a cycle, gets its right-hand side moved to the first
    /// conflict-free layer right of its left-hand side.
    fn repair(&self, graph: &RelationGraph<'_>, table: &mut LayerTable) {
        let on_cycle: Vec<bool> = graph
            .relations()
            .iter()
            .map(|&(left, right)| reaches(graph, right, left))
            .collect();

        loop {
            let violation = graph.relations().iter().zip(&on_cycle).find_map(
                |(&(left, right), &cyclic)| {
                    let (left_layer, right_layer) = (table.get(left)?, table.get(right)?);
                    let broken =
                        left_layer == right_layer || (left_layer > right_layer && !cyclic);
                    broken.then_some((left, right, left_layer, right_layer))
                },
            );

            let Some((left, right, left_layer, right_layer)) = violation else {
                break;
            };

            let layer = table.first_free_from(graph, right, left_layer + 1);
            table.set(right, layer);
            self.logger.debug(format_args!(
                "{} at layer {right_layer} clashes with {} at layer {left_layer}; moved to layer {layer}",
                graph.name(right),
                graph.name(left)
            ));
        }
    }
}

/// Returns `true` if `to` can be reached from `from` along relations.
fn reaches(graph: &RelationGraph<'_>, from: EntityId, to: EntityId) -> bool {
    let mut visited = vec![false; graph.len()];
    let mut stack = vec![from];
    visited[from.index()] = true;

    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        for &child in graph.children(current) {
            if !visited[child.index()] {
                visited[child.index()] = true;
                stack.push(child);
            }
        }
    }
    false
}

/// Rightmost layer among the placed parents of `id`.
fn max_parent_layer(graph: &RelationGraph<'_>, table: &LayerTable, id: EntityId) -> Option<usize> {
    graph
        .parents(id)
        .iter()
        .filter_map(|&parent| table.get(parent))
        .max()
}

/// Transitive children of `id`, breadth first, each visited once.
fn descendants(graph: &RelationGraph<'_>, id: EntityId) -> Vec<EntityId> {
    let mut visited = IndexSet::new();
    visited.insert(id);
    let mut queue = VecDeque::from([id]);

    while let Some(current) = queue.pop_front() {
        for &child in graph.children(current) {
            if visited.insert(child) {
                queue.push_back(child);
            }
        }
    }

    visited.into_iter().skip(1).collect()
}

/// Turns the table into layer lists with empty layers removed.
fn compact(graph: &RelationGraph<'_>, table: &LayerTable) -> Vec<Vec<EntityId>> {
    let mut used: Vec<usize> = graph.ids().filter_map(|id| table.get(id)).collect();
    used.sort_unstable();
    used.dedup();

    let mut layers = vec![Vec::new(); used.len()];
    for id in graph.ids() {
        if let Some(layer) = table.get(id) {
            // `used` holds every assigned layer, so the search always succeeds.
            if let Ok(index) = used.binary_search(&layer) {
                layers[index].push(id);
            }
        }
    }
    layers
}

/// Gives every layer its initial vertical order.
///
/// The last layer follows the processing order. Every earlier layer is
/// sorted by the position of each entity's topmost neighbor in the next
/// layer (entities without one first), ties broken by processing order.
fn seed_order(graph: &RelationGraph<'_>, layers: &mut [Vec<EntityId>]) {
    let Some(last) = layers.last_mut() else {
        return;
    };
    last.sort_by_key(|&id| graph.rank(id));

    let mut position = vec![None; graph.len()];
    for index in (0..layers.len()).rev() {
        if index + 1 < layers.len() {
            let layer = &mut layers[index];
            layer.sort_by_key(|&id| {
                let target = graph
                    .neighbors(id)
                    .iter()
                    .filter_map(|neighbor| position[neighbor.index()])
                    .min();
                (target, graph.rank(id))
            });
        }

        position.iter_mut().for_each(|slot| *slot = None);
        for (slot, &id) in layers[index].iter().enumerate() {
            position[id.index()] = Some(slot);
        }
    }
}
