//! Top-level pipeline
//!
//! A [`Pipeline`] owns the root of a composition tree and exposes it under the
//! `embedding` slot: every parameter path starts with `embedding__`, and
//! every error location starts with `embedding`.

use crate::config::{PipelineConfig, PipelineSpec};
use crate::executor::Executor;
use crate::node::{Node, NodeState};
use crate::router::{self, ParamMap, Update};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use vecflow_backends::default_registry;
use vecflow_core::{BackendRegistry, Error, Features, Result};
use vecflow_schema::{parse, Schema, Slot, PATH_SEPARATOR};

/// Slot name of the pipeline root
pub const EMBEDDING: &str = Slot::Embedding.as_str();

#[derive(Debug)]
pub struct Pipeline {
    root: Node,
    registry: Arc<BackendRegistry>,
    config: PipelineConfig,
}

fn executor<'r>(registry: &'r BackendRegistry, config: &PipelineConfig) -> Executor<'r> {
    Executor::new(registry).with_parallel_concat(config.parallel_concat)
}

fn check_labels(rows: usize, labels: Option<&[Value]>) -> Result<()> {
    match labels {
        Some(labels) if labels.len() != rows => Err(Error::InvalidInput(format!(
            "got {} labels for {} rows",
            labels.len(),
            rows
        ))),
        _ => Ok(()),
    }
}

impl Pipeline {
    /// Parse a schema literal and build a lazy pipeline over the built-in backends
    pub fn new(schema: &Value) -> Result<Self> {
        Self::builder(parse(schema)?).build()
    }

    pub fn from_schema(schema: Schema) -> Result<Self> {
        Self::builder(schema).build()
    }

    pub fn from_spec(spec: PipelineSpec) -> Result<Self> {
        Self::builder(spec.schema).config(spec.config).build()
    }

    pub fn builder(schema: Schema) -> PipelineBuilder {
        PipelineBuilder::new(schema)
    }

    /// Train every node on `data`
    pub fn fit<S: AsRef<str>>(&mut self, data: &[S], labels: Option<&[Value]>) -> Result<&mut Self> {
        self.fit_features(&Features::text(data), labels)
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, data: &[S], labels: Option<&[Value]>) -> Result<Features> {
        self.fit_transform_features(&Features::text(data), labels)
    }

    pub fn transform<S: AsRef<str>>(&mut self, data: &[S]) -> Result<Features> {
        self.transform_features(&Features::text(data))
    }

    pub fn fit_features(&mut self, data: &Features, labels: Option<&[Value]>) -> Result<&mut Self> {
        check_labels(data.n_rows(), labels)?;
        info!(rows = data.n_rows(), nodes = self.root.size(), "fitting pipeline");
        executor(&self.registry, &self.config).fit(&mut self.root, data, labels, EMBEDDING)?;
        Ok(self)
    }

    pub fn fit_transform_features(&mut self, data: &Features, labels: Option<&[Value]>) -> Result<Features> {
        check_labels(data.n_rows(), labels)?;
        info!(rows = data.n_rows(), nodes = self.root.size(), "fitting pipeline");
        executor(&self.registry, &self.config).fit_transform(&mut self.root, data, labels, EMBEDDING)
    }

    pub fn transform_features(&mut self, data: &Features) -> Result<Features> {
        executor(&self.registry, &self.config).transform(&mut self.root, data, EMBEDDING)
    }

    /// Every plain kwarg keyed by its `embedding__...` path
    pub fn get_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        router::collect(&self.root, EMBEDDING, &mut params);
        params
    }

    /// Apply a batch of `embedding__...` updates atomically.
    ///
    /// Returns how many kwargs changed. Each change resets the owning leaf
    /// and its ancestors, plus any chain stages after it. Concat siblings
    /// keep their fitted state.
    pub fn set_params(&mut self, params: &ParamMap) -> Result<usize> {
        let mut updates = Vec::with_capacity(params.len());
        for (key, value) in params {
            let relative = key
                .strip_prefix(EMBEDDING)
                .and_then(|rest| rest.strip_prefix(PATH_SEPARATOR))
                .ok_or_else(|| {
                    let first = key.split(PATH_SEPARATOR).next().unwrap_or_default();
                    Error::parameter_path(key.as_str(), first, format!("pipeline parameters start with '{EMBEDDING}{PATH_SEPARATOR}'"))
                })?;
            updates.push(Update {
                path: key,
                relative,
                value,
            });
        }
        let changed = router::apply_updates(&mut self.root, updates)?;
        debug!(requested = params.len(), changed, "parameters updated");
        Ok(changed)
    }

    /// Single-path [`set_params`](Self::set_params)
    pub fn set_param(&mut self, path: impl Into<String>, value: Value) -> Result<usize> {
        let mut params = ParamMap::new();
        params.insert(path.into(), value);
        self.set_params(&params)
    }

    /// Node addressed by `embedding` or `embedding__...`
    pub fn node_at(&self, path: &str) -> Option<&Node> {
        if path == EMBEDDING {
            return Some(&self.root);
        }
        let rest = path.strip_prefix(EMBEDDING)?.strip_prefix(PATH_SEPARATOR)?;
        self.root.node_at(rest)
    }

    /// Current schema, reflecting every applied parameter change
    pub fn schema(&self) -> Schema {
        self.root.to_schema()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn state(&self) -> NodeState {
        self.root.state()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.state() == NodeState::Fitted
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// A fresh pipeline with the same schema, registry and config
    pub fn clone_unfitted(&self) -> Result<Self> {
        PipelineBuilder::new(self.schema())
            .shared_registry(Arc::clone(&self.registry))
            .config(self.config)
            .build()
    }
}

pub struct PipelineBuilder {
    schema: Schema,
    registry: Option<Arc<BackendRegistry>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            registry: None,
            config: PipelineConfig::default(),
        }
    }

    /// Resolve backend identifiers against `registry` instead of the built-ins
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn shared_registry(mut self, registry: Arc<BackendRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.config.lazy = lazy;
        self
    }

    pub fn parallel_concat(mut self, enabled: bool) -> Self {
        self.config.parallel_concat = enabled;
        self
    }

    /// Build the tree. Eager pipelines construct every backend here, so an
    /// unknown identifier or bad kwarg fails the build.
    pub fn build(self) -> Result<Pipeline> {
        let registry = self.registry.unwrap_or_else(|| Arc::new(default_registry()));
        let mut root = Node::from_schema(&self.schema);
        if !self.config.lazy {
            executor(&registry, &self.config).construct(&mut root, EMBEDDING)?;
        }
        debug!(nodes = root.size(), lazy = self.config.lazy, "pipeline built");
        Ok(Pipeline {
            root,
            registry,
            config: self.config,
        })
    }
}
