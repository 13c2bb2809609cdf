//! # vecflow Schema
//!
//! The configuration language of vecflow pipelines.
//!
//! A schema is a nested literal (usually JSON) describing how text
//! featurization backends are composed. This crate turns that literal into a
//! typed [`Schema`] tree and back. It knows nothing about which backends exist:
//! identifiers are only resolved when a pipeline first needs them.
//!
//! ## Shapes
//!
//! | Literal | Meaning |
//! |---------|---------|
//! | `"tfidf"` | a single backend with no kwargs |
//! | `["nmf", {"n_components": 30}]` | a single backend with kwargs |
//! | `["tfidf", "normalize"]` | a sequential chain (two or more steps) |
//! | `{"concat": [...]}` | a fan-out whose outputs are concatenated |
//! | `{"transform": [...]}` | an explicit sequential chain |
//!
//! A kwarg named `schema` holds a nested schema (for compound backends) and is
//! parsed recursively.
//!
//! ## Example
//!
//! ```rust
//! use vecflow_schema::{parse, Schema};
//! use serde_json::json;
//!
//! let schema = parse(&json!(["tfidf", ["nmf", {"n_components": 30}]])).unwrap();
//! assert_eq!(schema.leaf_names(), vec!["tfidf", "nmf"]);
//! assert!(matches!(schema, Schema::Sequence { .. }));
//! ```

pub mod parser;
pub mod schema;

pub use parser::{parse, CONCAT_KEY, SCHEMA_KWARG, TRANSFORM_KEY};
pub use schema::{KwargSchema, Schema, SchemaError, Slot, PATH_SEPARATOR};
