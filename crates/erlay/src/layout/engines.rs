//! Layout engine factory module
//!
//! Vertical ordering and field ordering each come in interchangeable
//! strategies selected by [`VerticalStrategy`] and [`FieldStrategy`]. This
//! module defines the trait every strategy implements and the
//! [`EngineBuilder`] that configures them and drives the whole pipeline:
//!
//! ```text
//! RelationGraph
//!     ↓ LayerAssigner
//! Layering (seeded)
//!     ↓ VerticalOrdering
//!     ↓ CrossingRefiner
//! Layering (final)
//!     ↓ FieldOrderer (FieldOrdering)
//! FieldOrder
//!     ↓ PositionCalculator
//! Bounds per entity
//! ```

use std::time::Duration;

use erlay_core::geometry::Bounds;

use super::{
    crossing::{CrossingRefiner, RefinementReport, count_crossings},
    fields::{BarycenterFields, DispersalFields, FieldOrder, FieldOrderer, FieldSlot},
    graph::RelationGraph,
    layering::{LayerAssigner, Layering},
    ordering::{Barycenter, Clustered},
    positioning::PositionCalculator,
};
use crate::{
    config::{FieldStrategy, LayoutConfig, MIN_VERTICAL_PASSES, SpacingConfig, VerticalStrategy},
    logger::{LayoutLogger, TARGET_ROOT},
};

/// Trait defining the interface for vertical ordering strategies
pub trait VerticalOrdering {
    /// Permute the entities of every layer of `layering`.
    ///
    /// Implementations must not move entities between layers and must break
    /// every tie by [`RelationGraph::rank`].
    fn order(&self, graph: &RelationGraph<'_>, layering: &mut Layering, logger: LayoutLogger<'_>);
}

/// Trait defining the interface for field ordering strategies
pub trait FieldOrdering {
    /// Returns the new order of `slots` as indices into `slots`.
    ///
    /// `slots` lists one entity's fields in their current order. The result
    /// must be a permutation of `0..slots.len()`.
    fn arrange(&self, slots: &[FieldSlot]) -> Vec<usize>;
}

/// Everything the pipeline computes for one schema.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    layering: Layering,
    field_order: FieldOrder,
    bounds: Vec<Bounds>,
    refinement: RefinementReport,
}

impl EngineOutput {
    pub fn layering(&self) -> &Layering {
        &self.layering
    }

    pub fn field_order(&self) -> &FieldOrder {
        &self.field_order
    }

    /// Entity boxes indexed by entity id.
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub fn refinement(&self) -> &RefinementReport {
        &self.refinement
    }

    pub fn into_parts(self) -> (Layering, FieldOrder, Vec<Bounds>, RefinementReport) {
        (self.layering, self.field_order, self.bounds, self.refinement)
    }
}

/// Builder for creating and configuring layout engines.
///
/// The builder only holds settings; [`EngineBuilder::build`] can be called
/// any number of times.
#[derive(Debug, Clone)]
pub struct EngineBuilder<'l> {
    vertical_strategy: VerticalStrategy,
    vertical_passes: usize,
    refine: bool,
    max_refine_iterations: usize,
    refine_budget: Option<Duration>,
    field_strategy: FieldStrategy,
    field_passes: usize,
    spacing: SpacingConfig,

    logger: LayoutLogger<'l>,
}

impl Default for EngineBuilder<'static> {
    fn default() -> Self {
        Self::new(LayoutLogger::global())
    }
}

impl<'l> EngineBuilder<'l> {
    /// Create a new engine builder with default strategies and spacing
    pub fn new(logger: LayoutLogger<'l>) -> Self {
        let layout = LayoutConfig::default();
        Self {
            vertical_strategy: layout.vertical_strategy(),
            vertical_passes: layout.vertical_passes(),
            refine: layout.refine(),
            max_refine_iterations: layout.max_refine_iterations(),
            refine_budget: layout.refine_budget(),
            field_strategy: layout.field_strategy(),
            field_passes: layout.field_passes(),
            spacing: SpacingConfig::default(),
            logger,
        }
    }

    /// Apply every setting of a layout configuration
    pub fn with_layout_config(self, config: &LayoutConfig) -> Self {
        self.with_vertical_strategy(config.vertical_strategy())
            .with_vertical_passes(config.vertical_passes())
            .with_refinement(
                config.refine(),
                config.max_refine_iterations(),
                config.refine_budget(),
            )
            .with_field_strategy(config.field_strategy())
            .with_field_passes(config.field_passes())
    }

    /// Select the vertical ordering strategy
    pub fn with_vertical_strategy(mut self, strategy: VerticalStrategy) -> Self {
        self.vertical_strategy = strategy;
        self
    }

    /// Set the number of forward/backward vertical sweeps
    pub fn with_vertical_passes(mut self, passes: usize) -> Self {
        self.vertical_passes = passes.max(MIN_VERTICAL_PASSES);
        self
    }

    /// Configure the crossing refinement stage
    pub fn with_refinement(
        mut self,
        enabled: bool,
        max_iterations: usize,
        budget: Option<Duration>,
    ) -> Self {
        self.refine = enabled;
        self.max_refine_iterations = max_iterations;
        self.refine_budget = budget;
        self
    }

    /// Select the field ordering strategy
    pub fn with_field_strategy(mut self, strategy: FieldStrategy) -> Self {
        self.field_strategy = strategy;
        self
    }

    /// Set the number of forward/backward field ordering passes
    pub fn with_field_passes(mut self, passes: usize) -> Self {
        self.field_passes = passes;
        self
    }

    /// Set the spacing used to compute coordinates
    pub fn with_spacing(mut self, spacing: SpacingConfig) -> Self {
        self.spacing = spacing;
        self
    }

    /// Create the configured vertical ordering engine
    pub fn vertical_engine(&self) -> Box<dyn VerticalOrdering> {
        match self.vertical_strategy {
            VerticalStrategy::Barycenter => Box::new(Barycenter::new(self.vertical_passes)),
            VerticalStrategy::Clustered => Box::new(Clustered::new(self.vertical_passes)),
        }
    }

    /// Create the configured field ordering engine
    pub fn field_engine(&self) -> Box<dyn FieldOrdering> {
        match self.field_strategy {
            FieldStrategy::Barycenter => Box::new(BarycenterFields),
            FieldStrategy::Dispersal => Box::new(DispersalFields),
        }
    }

    /// Run every layout stage on `graph`
    pub fn build(&self, graph: &RelationGraph<'_>) -> EngineOutput {
        let logger = self.logger;

        let mut layering = LayerAssigner::new(logger).assign(graph);

        self.vertical_engine().order(graph, &mut layering, logger);

        let field_order = FieldOrder::identity(graph);

        let refinement = if self.refine {
            CrossingRefiner::new(self.max_refine_iterations, logger)
                .with_budget(self.refine_budget)
                .refine(graph, &mut layering, &field_order)
        } else {
            let crossings = count_crossings(graph, &layering, &field_order);
            logger
                .for_stage(TARGET_ROOT)
                .debug(format_args!("refinement disabled; {crossings} crossings"));
            RefinementReport::unrefined(crossings)
        };

        let field_engine = self.field_engine();
        let field_order = FieldOrderer::new(field_engine.as_ref(), self.field_passes, logger)
            .order(graph, &layering, field_order);

        let bounds = PositionCalculator::new(&self.spacing, logger).calculate(graph, &layering);

        EngineOutput {
            layering,
            field_order,
            bounds,
            refinement,
        }
    }
}
