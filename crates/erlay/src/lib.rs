//! Erlay - automatic layered layout for entity-relationship diagrams.
//!
//! Given entities (each with an ordered field list) and field-level
//! relationships without coordinates, Erlay assigns every entity a
//! horizontal layer, orders entities within each layer, orders each
//! entity's fields, and computes box coordinates. Directly related entities
//! never share a layer, the left-hand side of a relationship is laid out to
//! the left of its right-hand side, and edge crossings are kept low.
//!
//! Layout is a pure function of its input: nothing is cached between calls
//! and the caller's entities are never mutated.
//!
//! # Examples
//!
//! ```
//! use erlay::{
//!     LayoutBuilder,
//!     schema::{Cardinality, Endpoint, Entity, Field, Relationship},
//! };
//!
//! let entities = vec![
//!     Entity::new("users", vec![Field::new("id", "int").with_primary_key(true)]),
//!     Entity::new(
//!         "posts",
//!         vec![
//!             Field::new("id", "int").with_primary_key(true),
//!             Field::new("authorId", "int").with_foreign_key(true),
//!         ],
//!     ),
//! ];
//! let relationships = vec![Relationship::new(
//!     Endpoint::new("posts", "authorId"),
//!     Endpoint::new("users", "id"),
//!     Cardinality::ManyToOne,
//! )];
//!
//! let layout = LayoutBuilder::default()
//!     .layout(&entities, &relationships)
//!     .expect("valid schema");
//!
//! assert_eq!(layout.layer_of("posts"), Some(0));
//! assert_eq!(layout.layer_of("users"), Some(1));
//! ```

pub mod config;
mod error;
pub mod layout;
mod logger;

pub use erlay_core::{geometry, schema};
pub use error::ErlayError;
pub use layout::{Layout, RefinementReport};
pub use logger::LayoutLogger;

use log::Log;

use config::AppConfig;
use layout::{EngineBuilder, graph::RelationGraphBuilder};
use schema::{Entity, Relationship};

/// Builder for laying out entity-relationship diagrams.
///
/// The builder only holds configuration and a logging handle, so one
/// builder can serve any number of layouts, from any number of threads.
///
/// # Examples
///
/// ```
/// use erlay::{LayoutBuilder, config::AppConfig};
///
/// let builder = LayoutBuilder::new(AppConfig::default());
/// let layout = builder.layout(&[], &[]).expect("empty schema");
/// assert_eq!(layout.layer_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct LayoutBuilder<'l> {
    config: AppConfig,
    logger: LayoutLogger<'l>,
}

impl Default for LayoutBuilder<'static> {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl LayoutBuilder<'static> {
    /// Create a new layout builder with the given configuration.
    ///
    /// Records go to the logger installed in the `log` facade.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            logger: LayoutLogger::global(),
        }
    }
}

impl<'l> LayoutBuilder<'l> {
    /// Send log records to `sink` instead of the global logger.
    pub fn with_logger<'m>(self, sink: &'m dyn Log) -> LayoutBuilder<'m> {
        LayoutBuilder {
            config: self.config,
            logger: LayoutLogger::new(sink),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Lay out `entities` connected by `relationships`.
    ///
    /// Relationships naming an entity that is not in `entities` are ignored.
    /// Cycles are resolved, never reported.
    ///
    /// # Errors
    ///
    /// Returns [`ErlayError::Config`] if the spacing configuration is
    /// invalid and [`ErlayError::DuplicateEntity`] if two entities share a
    /// name.
    pub fn layout(
        &self,
        entities: &[Entity],
        relationships: &[Relationship],
    ) -> Result<Layout, ErlayError> {
        self.config.validate()?;

        let logger = self.logger;
        logger.info(format_args!(
            "laying out {} entities with {} relationships",
            entities.len(),
            relationships.len()
        ));

        let graph = RelationGraphBuilder::new(logger).build(entities, relationships)?;

        let output = EngineBuilder::new(logger)
            .with_layout_config(self.config.layout())
            .with_spacing(self.config.spacing().clone())
            .build(&graph);

        let layout = Layout::new(&graph, output, self.config.spacing().clone());

        logger.info(format_args!(
            "layout finished: {} layers, {} crossings",
            layout.layer_count(),
            layout.refinement().final_crossings()
        ));

        Ok(layout)
    }
}
