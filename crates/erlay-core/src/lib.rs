//! Erlay Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Erlay layout
//! engine and its front ends. It includes:
//!
//! - **Schema**: Entities, fields and relationships handed over by a schema
//!   parser ([`schema`] module)
//! - **Geometry**: Basic geometric types ([`geometry`] module)

pub mod geometry;
pub mod schema;
