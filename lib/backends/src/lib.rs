//! # vecflow Backends
//!
//! Built-in embeddings and transformations for vecflow pipelines.
//!
//! | Name | Kind | Trainable | Kwargs |
//! |------|------|-----------|--------|
//! | `tfidf` | embedding | yes | `max_features`, `min_df`, `lowercase`, `sublinear_tf`, `norm` |
//! | `hashing` | embedding | no | `n_features`, `trigrams` |
//! | `compound` | embedding | no | `normalize`, plus a nested `schema` |
//! | `normalize` | transformation | no | `norm` (`l1`, `l2`, `max`) |
//! | `scale` | transformation | yes | `with_mean`, `with_std` |
//! | `random_projection` | transformation | yes | `n_components`, `seed` |
//!
//! ```rust
//! use vecflow_backends::default_registry;
//! use vecflow_core::{Features, Params};
//!
//! let registry = default_registry();
//! let mut tfidf = registry.construct("tfidf", &Params::new(), "<root>").unwrap();
//! let out = tfidf
//!     .fit_transform(&Features::text(&["red apple", "green apple"]), None)
//!     .unwrap();
//! assert_eq!(out.n_rows(), 2);
//! ```

pub mod builtin;
pub mod compound;
pub mod hashing;
pub mod normalize;
pub mod projection;
pub mod scale;
pub mod text;
pub mod tfidf;

pub use builtin::{default_registry, BackendKind, BuiltinBackend};
pub use compound::CompoundEmbedding;
pub use hashing::HashingEmbedding;
pub use normalize::{Norm, Normalizer};
pub use projection::RandomProjection;
pub use scale::StandardScaler;
pub use tfidf::{TfidfConfig, TfidfEmbedding};
