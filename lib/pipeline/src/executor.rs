//! Tree execution
//!
//! Runs `fit`, `transform` and `fit_transform` over a [`Node`] tree, creating
//! backends on first use. Sequential children see the previous child's
//! output; concat children all see the node's input and their dense outputs
//! are joined column-wise in child order. A leaf with nested schema kwargs
//! runs those sub-trees first (in kwarg-name order) and feeds the joined
//! result to its own backend.

use crate::node::{ConcatNode, Kwarg, LeafNode, Node, NodeState, SequentialNode};
use crate::path;
use rayon::prelude::*;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, trace, warn};
use vecflow_core::{Backend, BackendError, BackendRegistry, Error, Features, Matrix, Result};
use vecflow_schema::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// `fit_transform`
    Fit,
    /// `transform`
    Apply,
}

/// Drives execution of a tree against a backend registry
#[derive(Debug, Clone, Copy)]
pub struct Executor<'r> {
    registry: &'r BackendRegistry,
    parallel_concat: bool,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r BackendRegistry) -> Self {
        Self {
            registry,
            parallel_concat: false,
        }
    }

    /// Run concat branches on the rayon pool
    pub fn with_parallel_concat(mut self, enabled: bool) -> Self {
        self.parallel_concat = enabled;
        self
    }

    /// Train `node` on `data`. `path` prefixes error locations.
    pub fn fit(&self, node: &mut Node, data: &Features, labels: Option<&[Value]>, path: &str) -> Result<()> {
        match node {
            Node::Leaf(leaf) => self.fit_leaf(leaf, data, labels, path),
            composite => self.run(composite, data, labels, path, Pass::Fit).map(drop),
        }
    }

    pub fn fit_transform(
        &self,
        node: &mut Node,
        data: &Features,
        labels: Option<&[Value]>,
        path: &str,
    ) -> Result<Features> {
        self.run(node, data, labels, path, Pass::Fit)
    }

    pub fn transform(&self, node: &mut Node, data: &Features, path: &str) -> Result<Features> {
        self.run(node, data, None, path, Pass::Apply)
    }

    /// Instantiate every backend in the tree without training anything
    pub fn construct(&self, node: &mut Node, path: &str) -> Result<()> {
        match node {
            Node::Leaf(leaf) => {
                for (name, kwarg) in leaf.kwargs.iter_mut() {
                    if let Kwarg::Schema(inner) = kwarg {
                        self.construct(inner, &path::join(path, name))?;
                    }
                }
                self.ensure_backend(leaf, path).map(drop)
            }
            composite => {
                if let Some(slot) = composite.child_slot() {
                    for (i, child) in composite.children_mut().iter_mut().enumerate() {
                        self.construct(child, &path::child(path, slot.as_str(), i))?;
                    }
                }
                if composite.state() == NodeState::Uninitialized {
                    composite.set_state(NodeState::Constructed);
                }
                Ok(())
            }
        }
    }

    fn run(
        &self,
        node: &mut Node,
        data: &Features,
        labels: Option<&[Value]>,
        path: &str,
        pass: Pass,
    ) -> Result<Features> {
        let result = match node {
            Node::Leaf(leaf) => return self.run_leaf(leaf, data, labels, path, pass),
            Node::Sequential(seq) => self.run_sequential(seq, data, labels, path, pass),
            Node::Concat(concat) => self.run_concat(concat, data, labels, path, pass),
        };
        let next = match (pass, result.is_ok(), node.state()) {
            (Pass::Fit, true, _) => NodeState::Fitted,
            (Pass::Fit, false, _) => NodeState::Uninitialized,
            (Pass::Apply, true, NodeState::Uninitialized) => NodeState::Constructed,
            (_, _, current) => current,
        };
        node.set_state(next);
        result
    }

    fn fit_leaf(&self, leaf: &mut LeafNode, data: &Features, labels: Option<&[Value]>, path: &str) -> Result<()> {
        let input = self.leaf_input(leaf, data, labels, path, Pass::Fit)?;
        debug!(
            path = path::display(path),
            backend = %leaf.backend_name,
            rows = input.n_rows(),
            "fitting backend"
        );
        let outcome = {
            let backend = self.ensure_backend(leaf, path)?;
            if backend.is_trainable() {
                backend.fit(&input, labels)
            } else {
                Ok(())
            }
        };
        match outcome {
            Ok(()) => {
                leaf.state = NodeState::Fitted;
                Ok(())
            }
            Err(source) => Err(discard(leaf, path, source)),
        }
    }

    fn run_leaf(
        &self,
        leaf: &mut LeafNode,
        data: &Features,
        labels: Option<&[Value]>,
        path: &str,
        pass: Pass,
    ) -> Result<Features> {
        let input = self.leaf_input(leaf, data, labels, path, pass)?;
        match pass {
            Pass::Fit => debug!(
                path = path::display(path),
                backend = %leaf.backend_name,
                rows = input.n_rows(),
                "fitting backend"
            ),
            Pass::Apply => trace!(
                path = path::display(path),
                backend = %leaf.backend_name,
                rows = input.n_rows(),
                "transforming"
            ),
        }
        let outcome = {
            let backend = self.ensure_backend(leaf, path)?;
            match pass {
                Pass::Fit if backend.is_trainable() => backend.fit_transform(&input, labels),
                Pass::Fit | Pass::Apply => backend.transform(&input),
            }
        };
        match (outcome, pass) {
            (Ok(output), Pass::Fit) => {
                leaf.state = NodeState::Fitted;
                Ok(output)
            }
            (Ok(output), Pass::Apply) => Ok(output),
            (Err(source), Pass::Fit) => Err(discard(leaf, path, source)),
            (Err(source), Pass::Apply) => Err(Error::backend(path::display(path), leaf.backend_name.as_str(), source)),
        }
    }

    /// Input for a leaf's own backend: `data`, or the joined outputs of its
    /// nested schema kwargs when it has any
    fn leaf_input<'d>(
        &self,
        leaf: &mut LeafNode,
        data: &'d Features,
        labels: Option<&[Value]>,
        path: &str,
        pass: Pass,
    ) -> Result<Cow<'d, Features>> {
        let mut parts = Vec::new();
        for (name, kwarg) in leaf.kwargs.iter_mut() {
            let Kwarg::Schema(inner) = kwarg else {
                continue;
            };
            let inner_path = path::join(path, name);
            let output = self.run(inner, data, labels, &inner_path, pass)?;
            let dense = output
                .into_dense()
                .map_err(|source| Error::backend(&inner_path, inner.label(), source))?;
            parts.push(dense);
        }
        if parts.is_empty() {
            return Ok(Cow::Borrowed(data));
        }
        let joined = Matrix::hconcat(&parts)
            .map_err(|source| Error::backend(path::display(path), leaf.backend_name.as_str(), source))?;
        Ok(Cow::Owned(Features::Dense(joined)))
    }

    fn run_sequential(
        &self,
        seq: &mut SequentialNode,
        data: &Features,
        labels: Option<&[Value]>,
        path: &str,
        pass: Pass,
    ) -> Result<Features> {
        let slot = seq.slot.as_str();
        let mut current = Cow::Borrowed(data);
        for (i, child) in seq.children.iter_mut().enumerate() {
            let output = self.run(child, &current, labels, &path::child(path, slot, i), pass)?;
            current = Cow::Owned(output);
        }
        Ok(current.into_owned())
    }

    fn run_concat(
        &self,
        concat: &mut ConcatNode,
        data: &Features,
        labels: Option<&[Value]>,
        path: &str,
        pass: Pass,
    ) -> Result<Features> {
        trace!(
            path = path::display(path),
            branches = concat.children.len(),
            parallel = self.parallel_concat,
            "running concat"
        );
        let branch = |(i, child): (usize, &mut Node)| -> Result<Matrix> {
            let branch_path = path::child(path, Slot::Concat.as_str(), i);
            let output = self.run(child, data, labels, &branch_path, pass)?;
            output
                .into_dense()
                .map_err(|source| Error::backend(&branch_path, child.label(), source))
        };
        let parts: Vec<Matrix> = if self.parallel_concat {
            concat.children.par_iter_mut().enumerate().map(branch).collect::<Result<_>>()?
        } else {
            concat.children.iter_mut().enumerate().map(branch).collect::<Result<_>>()?
        };
        let joined = Matrix::hconcat(&parts)
            .map_err(|source| Error::backend(path::display(path), "concat", source))?;
        Ok(Features::Dense(joined))
    }

    fn ensure_backend<'l>(&self, leaf: &'l mut LeafNode, path: &str) -> Result<&'l mut Box<dyn Backend>> {
        let backend = match leaf.backend.take() {
            Some(backend) => backend,
            None => {
                let backend = self
                    .registry
                    .construct(&leaf.backend_name, &leaf.plain_params(), path::display(path))?;
                leaf.state = NodeState::Constructed;
                backend
            }
        };
        Ok(leaf.backend.insert(backend))
    }
}

/// A failed fit leaves the backend in an unknown state; drop it
fn discard(leaf: &mut LeafNode, path: &str, source: BackendError) -> Error {
    warn!(
        path = path::display(path),
        backend = %leaf.backend_name,
        error = %source,
        "fit failed, discarding backend"
    );
    leaf.reset();
    Error::backend(path::display(path), leaf.backend_name.as_str(), source)
}

impl Node {
    /// Node-relative [`Executor::fit`]
    pub fn fit(&mut self, executor: &Executor<'_>, data: &Features, labels: Option<&[Value]>) -> Result<()> {
        executor.fit(self, data, labels, "")
    }

    /// Node-relative [`Executor::fit_transform`]
    pub fn fit_transform(
        &mut self,
        executor: &Executor<'_>,
        data: &Features,
        labels: Option<&[Value]>,
    ) -> Result<Features> {
        executor.fit_transform(self, data, labels, "")
    }

    /// Node-relative [`Executor::transform`]
    pub fn transform(&mut self, executor: &Executor<'_>, data: &Features) -> Result<Features> {
        executor.transform(self, data, "")
    }
}
