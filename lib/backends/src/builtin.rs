//! The closed set of built-in backends and the default registry

use crate::compound::CompoundEmbedding;
use crate::hashing::HashingEmbedding;
use crate::normalize::Normalizer;
use crate::projection::RandomProjection;
use crate::scale::StandardScaler;
use crate::tfidf::TfidfEmbedding;
use std::fmt;
use std::str::FromStr;
use vecflow_core::{Backend, BackendError, BackendRegistry, Params};

/// Whether a backend consumes text or dense features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Embedding,
    Transformation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinBackend {
    Tfidf,
    Hashing,
    Compound,
    Normalize,
    Scale,
    RandomProjection,
}

impl BuiltinBackend {
    pub const ALL: [BuiltinBackend; 6] = [
        BuiltinBackend::Tfidf,
        BuiltinBackend::Hashing,
        BuiltinBackend::Compound,
        BuiltinBackend::Normalize,
        BuiltinBackend::Scale,
        BuiltinBackend::RandomProjection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinBackend::Tfidf => crate::tfidf::NAME,
            BuiltinBackend::Hashing => crate::hashing::NAME,
            BuiltinBackend::Compound => crate::compound::NAME,
            BuiltinBackend::Normalize => crate::normalize::NAME,
            BuiltinBackend::Scale => crate::scale::NAME,
            BuiltinBackend::RandomProjection => crate::projection::NAME,
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            BuiltinBackend::Tfidf | BuiltinBackend::Hashing | BuiltinBackend::Compound => {
                BackendKind::Embedding
            }
            _ => BackendKind::Transformation,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Instantiate the backend from its kwargs
    pub fn create(&self, params: &Params) -> Result<Box<dyn Backend>, BackendError> {
        Ok(match self {
            BuiltinBackend::Tfidf => Box::new(TfidfEmbedding::from_params(params)?),
            BuiltinBackend::Hashing => Box::new(HashingEmbedding::from_params(params)?),
            BuiltinBackend::Compound => Box::new(CompoundEmbedding::from_params(params)?),
            BuiltinBackend::Normalize => Box::new(Normalizer::from_params(params)?),
            BuiltinBackend::Scale => Box::new(StandardScaler::from_params(params)?),
            BuiltinBackend::RandomProjection => Box::new(RandomProjection::from_params(params)?),
        })
    }
}

impl fmt::Display for BuiltinBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinBackend {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| BackendError::Unsupported(format!("no built-in backend named '{}'", s)))
    }
}

/// A registry holding every built-in backend
pub fn default_registry() -> BackendRegistry {
    BuiltinBackend::ALL
        .iter()
        .fold(BackendRegistry::new(), |registry, builtin| {
            let builtin = *builtin;
            registry.with(builtin.name(), move |params: &Params| builtin.create(params))
        })
}
