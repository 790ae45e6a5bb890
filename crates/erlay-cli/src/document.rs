//! Schema documents.
//!
//! A schema document is a TOML file holding the entities and relationships
//! of one diagram:
//!
//! ```toml
//! [[entities]]
//! name = "users"
//! fields = [{ name = "id", type = "int", primary_key = true }]
//!
//! [[relationships]]
//! from = { entity = "posts", field = "authorId" }
//! to = { entity = "users", field = "id" }
//! cardinality = "many_to_one"
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use erlay_core::schema::{Entity, Relationship};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    entities: Vec<Entity>,

    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl SchemaDocument {
    /// Read and parse the schema document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| CliError::io(path, err))?;
        Self::parse(&path.display().to_string(), source)
    }

    /// Parse a schema document; `name` labels the source in diagnostics.
    pub fn parse(name: &str, source: String) -> Result<Self, CliError> {
        match toml::from_str(&source) {
            Ok(document) => Ok(document),
            Err(err) => Err(CliError::schema(name, source, &err)),
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
}
