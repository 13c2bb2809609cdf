//! # vecflow Core
//!
//! Core types shared by every vecflow crate:
//!
//! - [`Matrix`] - dense row-major feature matrix
//! - [`Features`] - data flowing between steps (text or dense)
//! - [`Backend`] - the fit/transform capability of embeddings and transformations
//! - [`BackendRegistry`] - lookup table from backend identifier to factory
//! - [`Error`] - the error taxonomy of the whole workspace
//!
//! ## Example
//!
//! ```rust
//! use vecflow_core::{Backend, BackendError, BackendRegistry, Features, Params};
//! use serde_json::Value;
//!
//! struct Lengths;
//!
//! impl Backend for Lengths {
//!     fn name(&self) -> &str { "lengths" }
//!     fn is_trainable(&self) -> bool { false }
//!     fn fit(&mut self, _: &Features, _: Option<&[Value]>) -> Result<(), BackendError> { Ok(()) }
//!     fn transform(&self, data: &Features) -> Result<Features, BackendError> {
//!         let rows = data.as_text()?.iter().map(|d| vec![d.len() as f32]).collect();
//!         Ok(vecflow_core::Matrix::from_rows(rows)?.into())
//!     }
//! }
//!
//! let registry = BackendRegistry::new()
//!     .with("lengths", |_: &Params| Ok(Box::new(Lengths) as Box<dyn Backend>));
//! let backend = registry.construct("lengths", &Params::new(), "<root>").unwrap();
//! let out = backend.transform(&Features::text(&["abc", "de"])).unwrap();
//! assert_eq!(out.n_cols(), Some(1));
//! ```

pub mod backend;
pub mod error;
pub mod features;
pub mod matrix;
pub mod params;
pub mod registry;

pub use backend::{Backend, BackendError};
pub use error::{Error, Result};
pub use features::Features;
pub use matrix::Matrix;
pub use params::{ParamReader, Params};
pub use registry::{BackendFactory, BackendRegistry};
