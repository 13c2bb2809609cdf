//! # vecflow Pipeline
//!
//! Turns a parsed [`Schema`](vecflow_schema::Schema) into an executable
//! composition tree:
//!
//! - [`Node`] - leaf, sequential and concat nodes with a lazy backend lifecycle
//! - [`Executor`] - `fit` / `transform` / `fit_transform` over a tree
//! - parameter routing - `get_params` / `set_params` keyed by `__` paths
//! - [`Pipeline`] - the owning facade, rooted at the `embedding` slot
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use vecflow_pipeline::{NodeState, Pipeline};
//!
//! let mut pipeline = Pipeline::new(&json!([
//!     {"concat": [["tfidf", {"min_df": 1}], ["hashing", {"n_features": 16}]]},
//!     ["normalize", {"norm": "l2"}]
//! ]))
//! .unwrap();
//! assert_eq!(pipeline.state(), NodeState::Uninitialized);
//!
//! let docs = ["the quick brown fox", "jumps over the lazy dog"];
//! pipeline.fit(&docs, None).unwrap();
//! assert!(pipeline.is_fitted());
//!
//! pipeline
//!     .set_param("embedding__transformations__0__concat__1__n_features", json!(32))
//!     .unwrap();
//! assert!(!pipeline.is_fitted());
//! ```

pub mod config;
pub mod executor;
pub mod node;
pub mod path;
pub mod pipeline;
pub mod router;

#[cfg(test)]
mod testing;

pub use config::{PipelineConfig, PipelineSpec};
pub use executor::Executor;
pub use node::{ConcatNode, Kwarg, LeafNode, Node, NodeKind, NodeState, SequentialNode};
pub use pipeline::{Pipeline, PipelineBuilder, EMBEDDING};
pub use router::ParamMap;
