//! Automatic layout of entity-relationship diagrams.
//!
//! # Pipeline
//!
//! ```text
//! Entities + Relationships
//!     ↓ graph       (dedup, processing order)
//! RelationGraph
//!     ↓ layering    (layer per entity, seed order)
//!     ↓ ordering    (barycenter sweeps)
//!     ↓ crossing    (adjacent swaps)
//!     ↓ fields      (field order per entity)
//!     ↓ positioning (coordinates)
//! Layout
//! ```
//!
//! # Submodules
//!
//! - [`graph`] - Relation resolution, adjacency and processing order
//! - [`layering`] - Layer assignment with cascading conflict resolution
//! - [`ordering`] - Vertical ordering strategies
//! - [`crossing`] - Crossing counting and refinement
//! - [`fields`] - Field ordering strategies
//! - [`positioning`] - Coordinate assignment
//!
//! # Re-exports
//!
//! - [`EngineBuilder`] - Builder for configuring strategies and running the pipeline

pub mod crossing;
mod engines;
pub mod fields;
pub mod graph;
pub mod layering;
pub mod ordering;
pub mod positioning;

use indexmap::IndexMap;

use erlay_core::{
    geometry::{Bounds, Point},
    schema::Entity,
};

use crate::config::SpacingConfig;

pub use engines::{EngineBuilder, EngineOutput, FieldOrdering, VerticalOrdering};
pub use crossing::RefinementReport;

use graph::RelationGraph;

/// The computed layout of one schema.
///
/// Entities are addressed by name. Every input entity is present, including
/// entities without any relationship.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Entity copies with reordered fields, in input order.
    entities: Vec<Entity>,
    index: IndexMap<String, usize>,
    layer_of: Vec<usize>,
    layers: Vec<Vec<usize>>,
    bounds: Vec<Bounds>,
    spacing: SpacingConfig,
    refinement: RefinementReport,
}

impl Layout {
    pub(crate) fn new(graph: &RelationGraph<'_>, output: EngineOutput, spacing: SpacingConfig) -> Self {
        let (layering, field_order, bounds, refinement) = output.into_parts();

        let entities: Vec<Entity> = graph
            .ids()
            .map(|id| {
                let entity = graph.entity(id);
                let fields = field_order
                    .order(id)
                    .iter()
                    .map(|&field| entity.fields()[field].clone())
                    .collect();
                entity.with_field_order(fields)
            })
            .collect();

        let index = entities
            .iter()
            .enumerate()
            .map(|(position, entity)| (entity.name().to_string(), position))
            .collect();

        Self {
            entities,
            index,
            layer_of: graph.ids().map(|id| layering.layer_of(id)).collect(),
            layers: layering
                .layers()
                .iter()
                .map(|layer| layer.iter().map(|id| id.index()).collect())
                .collect(),
            bounds,
            spacing,
            refinement,
        }
    }

    /// Layer index of the named entity.
    pub fn layer_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|&i| self.layer_of[i])
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Entity names per layer, top to bottom.
    pub fn layers(&self) -> Vec<Vec<&str>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&i| self.entities[i].name()).collect())
            .collect()
    }

    /// The named entity with its fields in layout order.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// All entities with their fields in layout order, in input order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Top-left corner of the named entity's box.
    pub fn position(&self, name: &str) -> Option<Point> {
        self.bounds_of(name).map(Bounds::min_point)
    }

    pub fn bounds_of(&self, name: &str) -> Option<Bounds> {
        self.index.get(name).map(|&i| self.bounds[i])
    }

    /// Smallest rectangle containing every entity box.
    pub fn bounds(&self) -> Bounds {
        self.bounds
            .iter()
            .copied()
            .reduce(|acc, bounds| acc.merge(&bounds))
            .unwrap_or_default()
    }

    /// Spacing the coordinates were computed with.
    pub fn spacing(&self) -> &SpacingConfig {
        &self.spacing
    }

    pub fn refinement(&self) -> &RefinementReport {
        &self.refinement
    }
}
