//! Configuration types for Erlay layout.
//!
//! This module provides configuration structures that control which strategy
//! each layout stage uses, how hard the iterative stages work, and the
//! spacing constants used to turn the layout into coordinates. All types
//! implement [`serde::Deserialize`] for flexible loading from external
//! sources; missing keys fall back to their defaults.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining layout and spacing settings.
//! - [`LayoutConfig`] - Strategy selection and iteration bounds.
//! - [`SpacingConfig`] - Box dimensions and gaps used by coordinate assignment.
//!
//! # Example
//!
//! ```
//! # use erlay::config::{AppConfig, FieldStrategy};
//! let config = AppConfig::default();
//! assert_eq!(config.layout().field_strategy(), FieldStrategy::Barycenter);
//! assert!(config.spacing().validate().is_ok());
//! ```

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::error::ErlayError;

/// Minimum number of forward/backward sweeps of vertical ordering.
pub const MIN_VERTICAL_PASSES: usize = 4;

/// Top-level configuration combining layout and spacing settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Spacing configuration section.
    #[serde(default)]
    spacing: SpacingConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified layout and spacing configurations.
    pub fn new(layout: LayoutConfig, spacing: SpacingConfig) -> Self {
        Self { layout, spacing }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the spacing configuration.
    pub fn spacing(&self) -> &SpacingConfig {
        &self.spacing
    }

    /// Checks every section for values the layout cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ErlayError::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ErlayError> {
        self.spacing.validate()
    }
}

/// Available strategies for ordering entities within a layer.
///
/// The names match external configuration strings (snake_case).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalStrategy {
    /// Weighted barycenter sweeps only
    Barycenter,
    /// Weighted barycenter sweeps that keep clusters and source chains contiguous (default)
    #[default]
    Clustered,
}

impl FromStr for VerticalStrategy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "barycenter" => Ok(Self::Barycenter),
            "clustered" => Ok(Self::Clustered),
            _ => Err("Unsupported vertical ordering strategy"),
        }
    }
}

impl From<VerticalStrategy> for &'static str {
    fn from(val: VerticalStrategy) -> Self {
        match val {
            VerticalStrategy::Barycenter => "barycenter",
            VerticalStrategy::Clustered => "clustered",
        }
    }
}

impl Display for VerticalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Available strategies for ordering the fields of an entity.
///
/// The names match external configuration strings (snake_case).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStrategy {
    /// Sort connected fields by the position of what they connect to (default)
    #[default]
    Barycenter,
    /// Spread connected fields evenly over the field list
    Dispersal,
}

impl FromStr for FieldStrategy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "barycenter" => Ok(Self::Barycenter),
            "dispersal" => Ok(Self::Dispersal),
            _ => Err("Unsupported field ordering strategy"),
        }
    }
}

impl From<FieldStrategy> for &'static str {
    fn from(val: FieldStrategy) -> Self {
        match val {
            FieldStrategy::Barycenter => "barycenter",
            FieldStrategy::Dispersal => "dispersal",
        }
    }
}

impl Display for FieldStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Strategy selection and iteration bounds for the layout stages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Strategy used to order entities within a layer.
    vertical_strategy: VerticalStrategy,

    /// Number of forward/backward sweep pairs; raised to [`MIN_VERTICAL_PASSES`].
    vertical_passes: usize,

    /// Whether the adjacent-swap crossing refinement runs at all.
    refine: bool,

    /// Upper bound on refinement sweeps.
    max_refine_iterations: usize,

    /// Optional wall-clock budget for refinement, in milliseconds.
    refine_budget_ms: Option<u64>,

    /// Strategy used to order the fields of each entity.
    field_strategy: FieldStrategy,

    /// Number of forward/backward field ordering pass pairs. The orderer
    /// may run up to `MAX_SETTLE_PASSES` more while fields still move; zero
    /// disables field ordering.
    field_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertical_strategy: VerticalStrategy::default(),
            vertical_passes: MIN_VERTICAL_PASSES,
            refine: true,
            max_refine_iterations: 16,
            refine_budget_ms: None,
            field_strategy: FieldStrategy::default(),
            field_passes: 2,
        }
    }
}

impl LayoutConfig {
    pub fn with_vertical_strategy(mut self, strategy: VerticalStrategy) -> Self {
        self.vertical_strategy = strategy;
        self
    }

    pub fn with_vertical_passes(mut self, passes: usize) -> Self {
        self.vertical_passes = passes;
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_max_refine_iterations(mut self, iterations: usize) -> Self {
        self.max_refine_iterations = iterations;
        self
    }

    pub fn with_refine_budget(mut self, budget: Option<Duration>) -> Self {
        self.refine_budget_ms = budget.map(|budget| budget.as_millis() as u64);
        self
    }

    pub fn with_field_strategy(mut self, strategy: FieldStrategy) -> Self {
        self.field_strategy = strategy;
        self
    }

    pub fn with_field_passes(mut self, passes: usize) -> Self {
        self.field_passes = passes;
        self
    }

    /// Returns the vertical ordering strategy.
    pub fn vertical_strategy(&self) -> VerticalStrategy {
        self.vertical_strategy
    }

    /// Returns the number of vertical sweep pairs, never below [`MIN_VERTICAL_PASSES`].
    pub fn vertical_passes(&self) -> usize {
        self.vertical_passes.max(MIN_VERTICAL_PASSES)
    }

    pub fn refine(&self) -> bool {
        self.refine
    }

    pub fn max_refine_iterations(&self) -> usize {
        self.max_refine_iterations
    }

    /// Returns the refinement wall-clock budget, if any.
    pub fn refine_budget(&self) -> Option<Duration> {
        self.refine_budget_ms.map(Duration::from_millis)
    }

    /// Returns the field ordering strategy.
    pub fn field_strategy(&self) -> FieldStrategy {
        self.field_strategy
    }

    pub fn field_passes(&self) -> usize {
        self.field_passes
    }
}

/// Box dimensions and gaps used to turn the layout into coordinates.
///
/// The renderer should draw entity boxes with the same `header_height` and
/// `field_height` so they line up with the computed positions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    base_x: f32,
    base_y: f32,
    entity_width: f32,
    horizontal_spacing: f32,
    header_height: f32,
    field_height: f32,
    min_vertical_spacing: f32,
    /// Pull entities toward the vertical center of their neighbors in earlier layers.
    recenter: bool,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            base_x: 50.0,
            base_y: 50.0,
            entity_width: 250.0,
            horizontal_spacing: 150.0,
            header_height: 40.0,
            field_height: 28.0,
            min_vertical_spacing: 40.0,
            recenter: true,
        }
    }
}

impl SpacingConfig {
    pub fn with_base(mut self, base_x: f32, base_y: f32) -> Self {
        self.base_x = base_x;
        self.base_y = base_y;
        self
    }

    pub fn with_entity_width(mut self, width: f32) -> Self {
        self.entity_width = width;
        self
    }

    pub fn with_horizontal_spacing(mut self, spacing: f32) -> Self {
        self.horizontal_spacing = spacing;
        self
    }

    pub fn with_header_height(mut self, height: f32) -> Self {
        self.header_height = height;
        self
    }

    pub fn with_field_height(mut self, height: f32) -> Self {
        self.field_height = height;
        self
    }

    pub fn with_min_vertical_spacing(mut self, spacing: f32) -> Self {
        self.min_vertical_spacing = spacing;
        self
    }

    pub fn with_recenter(mut self, recenter: bool) -> Self {
        self.recenter = recenter;
        self
    }

    pub fn base_x(&self) -> f32 {
        self.base_x
    }

    pub fn base_y(&self) -> f32 {
        self.base_y
    }

    pub fn entity_width(&self) -> f32 {
        self.entity_width
    }

    pub fn horizontal_spacing(&self) -> f32 {
        self.horizontal_spacing
    }

    pub fn header_height(&self) -> f32 {
        self.header_height
    }

    pub fn field_height(&self) -> f32 {
        self.field_height
    }

    pub fn min_vertical_spacing(&self) -> f32 {
        self.min_vertical_spacing
    }

    pub fn recenter(&self) -> bool {
        self.recenter
    }

    /// Height of an entity box with `field_count` fields.
    pub fn entity_height(&self, field_count: usize) -> f32 {
        self.header_height + field_count as f32 * self.field_height
    }

    /// Horizontal distance between the left edges of two adjacent layers.
    pub fn layer_stride(&self) -> f32 {
        self.entity_width + self.horizontal_spacing
    }

    /// Checks that every value is finite, gaps are non-negative and the
    /// entity width is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ErlayError::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ErlayError> {
        let values = [
            ("base_x", self.base_x),
            ("base_y", self.base_y),
            ("entity_width", self.entity_width),
            ("horizontal_spacing", self.horizontal_spacing),
            ("header_height", self.header_height),
            ("field_height", self.field_height),
            ("min_vertical_spacing", self.min_vertical_spacing),
        ];

        for (name, value) in values {
            if !value.is_finite() {
                return Err(ErlayError::Config(format!("{name} must be finite")));
            }
        }

        for (name, value) in &values[2..] {
            if *value < 0.0 {
                return Err(ErlayError::Config(format!("{name} must not be negative")));
            }
        }

        if self.entity_width == 0.0 {
            return Err(ErlayError::Config("entity_width must be positive".into()));
        }

        Ok(())
    }
}
