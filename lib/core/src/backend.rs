//! The capability shared by every embedding and transformation
//!
//! A backend is opaque to the pipeline: it is created lazily by a
//! [`BackendRegistry`](crate::BackendRegistry) factory, trained with `fit` and
//! applied with `transform`.

use crate::features::Features;
use serde_json::Value;

/// A failure raised by a concrete backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("backend must be fitted before transform")]
    NotFitted,

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// An embedding or transformation with a fit/transform capability
pub trait Backend: Send {
    /// Registry identifier of this backend
    fn name(&self) -> &str;

    /// Whether `fit` learns anything. Stateless backends skip it.
    fn is_trainable(&self) -> bool {
        true
    }

    fn fit(&mut self, data: &Features, labels: Option<&[Value]>) -> Result<(), BackendError>;

    fn transform(&self, data: &Features) -> Result<Features, BackendError>;

    /// Fit and transform in one call.
    ///
    /// Override when both can be computed in a single pass.
    fn fit_transform(
        &mut self,
        data: &Features,
        labels: Option<&[Value]>,
    ) -> Result<Features, BackendError> {
        self.fit(data, labels)?;
        self.transform(data)
    }
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name()).finish()
    }
}
