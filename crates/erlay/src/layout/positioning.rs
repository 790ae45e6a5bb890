//! Coordinate assignment.
//!
//! Layers become columns: layer `i` starts at
//! `base_x + i * (entity_width + horizontal_spacing)`. Within a column
//! entities are stacked top to bottom in layer order, each box being
//! `header_height + field_count * field_height` tall and separated by at
//! least `min_vertical_spacing`.
//!
//! With recentering enabled an entity is pulled down towards the mean
//! vertical center of its neighbors in earlier columns. The stacking
//! constraint always wins, so boxes never overlap and keep their order.

use erlay_core::geometry::{Bounds, Point, Size};

use super::{
    graph::{EntityId, RelationGraph},
    layering::Layering,
};
use crate::{config::SpacingConfig, logger::LayoutLogger};

/// Log target of this stage.
pub const TARGET: &str = "erlay::position";

/// Turns a layering into entity boxes.
#[derive(Debug, Clone, Copy)]
pub struct PositionCalculator<'s, 'l> {
    spacing: &'s SpacingConfig,
    logger: LayoutLogger<'l>,
}

impl<'s, 'l> PositionCalculator<'s, 'l> {
    pub fn new(spacing: &'s SpacingConfig, logger: LayoutLogger<'l>) -> Self {
        Self {
            spacing,
            logger: logger.for_stage(TARGET),
        }
    }

    /// Returns the box of every entity, indexed by entity id.
    pub fn calculate(&self, graph: &RelationGraph<'_>, layering: &Layering) -> Vec<Bounds> {
        let spacing = self.spacing;
        let mut bounds = vec![Bounds::default(); graph.len()];
        let mut placed = vec![false; graph.len()];

        for (index, layer) in layering.layers().iter().enumerate() {
            let x = spacing.base_x() + index as f32 * spacing.layer_stride();
            let mut previous_bottom: Option<f32> = None;

            for &id in layer {
                let height = spacing.entity_height(graph.entity(id).fields().len());
                let stacked = previous_bottom
                    .map_or(spacing.base_y(), |bottom| bottom + spacing.min_vertical_spacing());

                let desired = if spacing.recenter() {
                    desired_top(graph, &bounds, &placed, id, height)
                } else {
                    None
                };
                let top = desired.map_or(stacked, |desired| desired.max(stacked));

                bounds[id.index()] =
                    Point::new(x, top).to_bounds(Size::new(spacing.entity_width(), height));
                previous_bottom = Some(top + height);
            }

            for &id in layer {
                placed[id.index()] = true;
            }

            self.logger.trace(format_args!(
                "layer {index} at x = {x}, bottom = {}",
                previous_bottom.unwrap_or(spacing.base_y())
            ));
        }

        self.logger
            .debug(format_args!("positioned {} entities", graph.len()));
        bounds
    }
}

/// Top that centers an entity of `height` on its already placed neighbors.
fn desired_top(
    graph: &RelationGraph<'_>,
    bounds: &[Bounds],
    placed: &[bool],
    id: EntityId,
    height: f32,
) -> Option<f32> {
    let centers: Vec<f32> = graph
        .neighbors(id)
        .iter()
        .filter(|neighbor| placed[neighbor.index()])
        .map(|neighbor| bounds[neighbor.index()].center().y())
        .collect();

    if centers.is_empty() {
        return None;
    }
    let mean = centers.iter().sum::<f32>() / centers.len() as f32;
    Some(mean - height / 2.0)
}
