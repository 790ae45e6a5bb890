//! Schema model consumed by the layout engine.
//!
//! These types are what a schema parser hands over: an ordered list of
//! [`Entity`] values, each with an ordered [`Field`] list, and an ordered list
//! of [`Relationship`] values. The layout engine reads them and only ever
//! produces reordered *copies* of entities; the caller's values are never
//! mutated.
//!
//! All types implement [`serde::Deserialize`] so front ends can load them
//! from external documents.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

/// A single column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Field {
    name: String,

    /// Free-form type tag such as `int` or `varchar(255)`.
    #[serde(rename = "type", default)]
    type_tag: String,

    #[serde(default)]
    primary_key: bool,

    #[serde(default)]
    foreign_key: bool,

    #[serde(default)]
    unique: bool,

    #[serde(default)]
    required: bool,
}

impl Field {
    /// Create a field with the given name and type tag and all flags cleared.
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            primary_key: false,
            foreign_key: false,
            unique: false,
            required: false,
        }
    }

    /// Mark the field as (part of) the primary key.
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Mark the field as a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: bool) -> Self {
        self.foreign_key = foreign_key;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// A table-like node of the diagram.
///
/// The name is the identity of the entity; relationships refer to it by
/// name. Presentation attributes (`display_name`, `icon`, `color`) are passed
/// through to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    name: String,

    #[serde(default)]
    display_name: Option<String>,

    #[serde(default)]
    icon: Option<String>,

    #[serde(default)]
    color: Option<String>,

    #[serde(default)]
    fields: Vec<Field>,
}

impl Entity {
    /// Create an entity with the given name and ordered field list.
    ///
    /// # Examples
    ///
    /// ```
    /// use erlay_core::schema::{Entity, Field};
    ///
    /// let users = Entity::new(
    ///     "users",
    ///     vec![
    ///         Field::new("id", "int").with_primary_key(true),
    ///         Field::new("email", "varchar"),
    ///     ],
    /// );
    /// assert_eq!(users.name(), "users");
    /// assert_eq!(users.field_index("email"), Some(1));
    /// ```
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            icon: None,
            color: None,
            fields,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Returns a copy of this entity carrying `fields` instead of its own.
    ///
    /// Presentation attributes are preserved. The receiver is left untouched.
    pub fn with_field_order(&self, fields: Vec<Field>) -> Self {
        Self {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            icon: self.icon.clone(),
            color: self.color.clone(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name, falling back to the entity name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the position of the named field in the field list.
    pub fn field_index(&self, field_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name() == field_name)
    }
}

/// Cardinality of a relationship.
///
/// The names match external configuration strings (snake_case). Each variant
/// also has the compact arrow symbol used by the schema language.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// `-`
    OneToOne,
    /// `<`
    OneToMany,
    /// `>` (default)
    #[default]
    ManyToOne,
    /// `<>`
    ManyToMany,
}

impl Cardinality {
    /// Returns the arrow symbol of the schema language for this cardinality.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::OneToOne => "-",
            Self::OneToMany => "<",
            Self::ManyToOne => ">",
            Self::ManyToMany => "<>",
        }
    }
}

/// Error returned when a cardinality name or symbol is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported cardinality: {0}")]
pub struct ParseCardinalityError(String);

impl FromStr for Cardinality {
    type Err = ParseCardinalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_to_one" | "-" => Ok(Self::OneToOne),
            "one_to_many" | "<" => Ok(Self::OneToMany),
            "many_to_one" | ">" => Ok(Self::ManyToOne),
            "many_to_many" | "<>" => Ok(Self::ManyToMany),
            _ => Err(ParseCardinalityError(s.to_string())),
        }
    }
}

impl From<Cardinality> for &'static str {
    fn from(val: Cardinality) -> Self {
        match val {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

impl Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// One side of a relationship: an entity name and one of its field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Endpoint {
    entity: String,
    field: String,
}

impl Endpoint {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

/// A directed, field-level link between two entities.
///
/// Order matters: `from` is the left-hand side of the relationship as written
/// in the schema and is laid out to the left of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Relationship {
    from: Endpoint,
    to: Endpoint,

    #[serde(default)]
    cardinality: Cardinality,

    #[serde(default)]
    color: Option<String>,

    #[serde(default)]
    label: Option<String>,
}

impl Relationship {
    /// Create a relationship between two endpoints.
    ///
    /// # Examples
    ///
    /// ```
    /// use erlay_core::schema::{Cardinality, Endpoint, Relationship};
    ///
    /// let rel = Relationship::new(
    ///     Endpoint::new("posts", "authorId"),
    ///     Endpoint::new("users", "id"),
    ///     Cardinality::ManyToOne,
    /// );
    /// assert_eq!(rel.to_string(), "posts.authorId > users.id");
    /// ```
    pub fn new(from: Endpoint, to: Endpoint, cardinality: Cardinality) -> Self {
        Self {
            from,
            to,
            cardinality,
            color: None,
            label: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn from(&self) -> &Endpoint {
        &self.from
    }

    pub fn to(&self) -> &Endpoint {
        &self.to
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns `true` when both ends name the same entity.
    pub fn is_self_reference(&self) -> bool {
        self.from.entity == self.to.entity
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.from, self.cardinality.symbol(), self.to)
    }
}
