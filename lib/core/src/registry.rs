//! Backend registry
//!
//! A closed lookup table from backend identifier to factory. The pipeline
//! consumes it as a pure `resolve(name) -> factory` map; whoever builds the
//! registry decides which identifiers exist.

use crate::backend::{Backend, BackendError};
use crate::error::{Error, Result};
use crate::params::Params;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Creates a backend instance from its kwargs
pub type BackendFactory =
    Arc<dyn Fn(&Params) -> std::result::Result<Box<dyn Backend>, BackendError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: AHashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, returning the one it replaces
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Option<BackendFactory>
    where
        F: Fn(&Params) -> std::result::Result<Box<dyn Backend>, BackendError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory))
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Params) -> std::result::Result<Box<dyn Backend>, BackendError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&BackendFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Resolve `name` and instantiate it; `path` locates the node for errors
    pub fn construct(&self, name: &str, params: &Params, path: &str) -> Result<Box<dyn Backend>> {
        let factory = self.resolve(name).ok_or_else(|| Error::UnknownBackend {
            name: name.to_string(),
            path: path.to_string(),
            known: self.names().join(", "),
        })?;
        debug!(path, backend = name, kwargs = params.len(), "constructing backend");
        factory(params).map_err(|source| Error::backend(path, name, source))
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Features;
    use serde_json::Value;

    struct Identity;

    impl Backend for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn is_trainable(&self) -> bool {
            false
        }

        fn fit(&mut self, _data: &Features, _labels: Option<&[Value]>) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        fn transform(&self, data: &Features) -> std::result::Result<Features, BackendError> {
            Ok(data.clone())
        }
    }

    fn registry() -> BackendRegistry {
        BackendRegistry::new().with("identity", |_params: &Params| {
            Ok(Box::new(Identity) as Box<dyn Backend>)
        })
    }

    #[test]
    fn test_resolve_registered() {
        let registry = registry();
        assert!(registry.contains("identity"));
        assert_eq!(registry.names(), vec!["identity"]);
        let backend = registry.construct("identity", &Params::new(), "<root>").unwrap();
        assert_eq!(backend.name(), "identity");
    }

    #[test]
    fn test_unknown_backend() {
        let err = registry()
            .construct("not_a_real_embedding", &Params::new(), "transformations__1")
            .unwrap_err();
        match err {
            Error::UnknownBackend { name, path, known } => {
                assert_eq!(name, "not_a_real_embedding");
                assert_eq!(path, "transformations__1");
                assert_eq!(known, "identity");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_factory_error_carries_path() {
        let registry = BackendRegistry::new().with("broken", |_params: &Params| {
            Err(BackendError::InvalidParameter {
                name: "n".to_string(),
                message: "bad".to_string(),
            })
        });
        let err = registry.construct("broken", &Params::new(), "concat__0").unwrap_err();
        assert!(matches!(err, Error::BackendExecution { ref path, .. } if path == "concat__0"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = registry();
        let previous = registry.register("identity", |_params: &Params| {
            Ok(Box::new(Identity) as Box<dyn Backend>)
        });
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }
}
