//! # vecflow
//!
//! Declarative text featurization pipelines.
//!
//! A pipeline is described by a small schema language and turned into a tree
//! of embeddings and transformations. Backends are created lazily, so many
//! variants of a pipeline can be built and inspected cheaply, and every
//! kwarg in the tree is reachable through a flat `__`-delimited path, which
//! is all a hyperparameter search needs to know about it.
//!
//! ## Schema language
//!
//! | literal                         | meaning                          |
//! |---------------------------------|----------------------------------|
//! | `"tfidf"`                       | backend with default kwargs      |
//! | `["hashing", {"n_features": 64}]` | backend with kwargs            |
//! | `[a, b, c]`                     | run `a`, then `b`, then `c`      |
//! | `{"concat": [a, b]}`            | run both on the same input, join columns |
//! | `{"transform": [a, b]}`         | explicit chain                   |
//!
//! ## Quick Start
//!
//! ```rust
//! use vecflow::prelude::*;
//! use serde_json::json;
//!
//! let mut pipeline = Pipeline::new(&json!([
//!     {"concat": ["tfidf", ["hashing", {"n_features": 32}]]},
//!     "scale"
//! ]))
//! .unwrap();
//!
//! let docs = ["a first document", "another document here", "and one more"];
//! let features = pipeline.fit_transform(&docs, None).unwrap();
//! assert_eq!(features.n_rows(), 3);
//!
//! let params = pipeline.get_params();
//! assert_eq!(params["embedding__transformations__0__concat__1__n_features"], json!(32));
//! ```
//!
//! ## Crate Structure
//!
//! - [`vecflow-schema`](https://docs.rs/vecflow-schema) - schema language and parser
//! - [`vecflow-core`](https://docs.rs/vecflow-core) - backend trait, registry, matrices, errors
//! - [`vecflow-backends`](https://docs.rs/vecflow-backends) - built-in embeddings and transformations
//! - [`vecflow-pipeline`](https://docs.rs/vecflow-pipeline) - composition tree, routing and execution

// Re-export schema types
pub use vecflow_schema::{parse, KwargSchema, Schema, SchemaError, Slot};

// Re-export core types
pub use vecflow_core::{
    Backend, BackendError, BackendFactory, BackendRegistry,
    Features, Matrix, ParamReader, Params,
    Error, Result,
};

// Re-export built-in backends
pub use vecflow_backends::{default_registry, BackendKind, BuiltinBackend};

// Re-export pipeline
pub use vecflow_pipeline::{
    Executor, Node, NodeKind, NodeState, ParamMap,
    Pipeline, PipelineBuilder, PipelineConfig, PipelineSpec,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        parse, Schema,
        Backend, BackendError, BackendRegistry, Features, Matrix, Params,
        Error, Result,
        default_registry,
        NodeState, ParamMap, Pipeline, PipelineBuilder, PipelineConfig, PipelineSpec,
    };
}

/// Built-in backend implementations
pub mod backends {
    pub use vecflow_backends::{
        CompoundEmbedding, HashingEmbedding, Norm, Normalizer, RandomProjection, StandardScaler,
        TfidfConfig, TfidfEmbedding,
    };
}
