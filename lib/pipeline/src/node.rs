//! Composition tree
//!
//! A [`Node`] is one of three kinds: a [`LeafNode`] wrapping a single backend,
//! a [`SequentialNode`] chaining children, or a [`ConcatNode`] fanning out over
//! children. Every node exclusively owns its children and, for leaves, the
//! lazily created backend instance.
//!
//! Lifecycle of every node:
//!
//! ```text
//! Uninitialized --first use--> Constructed --fit--> Fitted
//!       ^                            |                 |
//!       +------ kwarg mutation ------+-----------------+
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use vecflow_core::{Backend, Params};
use vecflow_schema::{KwargSchema, Schema, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// No backend instance; kwargs may change freely
    Uninitialized,
    /// Backend instantiated but not trained
    Constructed,
    /// Backend trained; `transform` is well-defined
    Fitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    Sequential,
    Concat,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Sequential => "sequential",
            NodeKind::Concat => "concat",
        }
    }
}

/// A leaf kwarg: a plain value or an owned sub-tree
#[derive(Debug)]
pub enum Kwarg {
    Value(Value),
    Schema(Box<Node>),
}

#[derive(Debug)]
pub struct LeafNode {
    pub(crate) backend_name: String,
    pub(crate) kwargs: BTreeMap<String, Kwarg>,
    pub(crate) backend: Option<Box<dyn Backend>>,
    pub(crate) state: NodeState,
}

#[derive(Debug)]
pub struct SequentialNode {
    pub(crate) slot: Slot,
    pub(crate) children: Vec<Node>,
    pub(crate) state: NodeState,
}

#[derive(Debug)]
pub struct ConcatNode {
    pub(crate) children: Vec<Node>,
    pub(crate) state: NodeState,
}

#[derive(Debug)]
pub enum Node {
    Leaf(LeafNode),
    Sequential(SequentialNode),
    Concat(ConcatNode),
}

impl LeafNode {
    pub fn new(backend_name: impl Into<String>, kwargs: BTreeMap<String, Kwarg>) -> Self {
        Self {
            backend_name: backend_name.into(),
            kwargs,
            backend: None,
            state: NodeState::Uninitialized,
        }
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Kwarg> {
        &self.kwargs
    }

    /// A plain kwarg value, if present
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        match self.kwargs.get(name) {
            Some(Kwarg::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// The live backend, `None` until first use
    pub fn backend_instance(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn has_nested_schema(&self) -> bool {
        self.kwargs.values().any(|k| matches!(k, Kwarg::Schema(_)))
    }

    /// Kwargs handed to the backend factory; nested schemas are executed by
    /// the pipeline and never reach the factory
    pub fn plain_params(&self) -> Params {
        self.kwargs
            .iter()
            .filter_map(|(k, v)| match v {
                Kwarg::Value(value) => Some((k.clone(), value.clone())),
                Kwarg::Schema(_) => None,
            })
            .collect()
    }

    /// Drop the backend so the next use rebuilds it from the current kwargs
    pub(crate) fn reset(&mut self) {
        self.backend = None;
        self.state = NodeState::Uninitialized;
    }
}

impl Node {
    /// Build an unconstructed tree mirroring `schema`
    pub fn from_schema(schema: &Schema) -> Self {
        match schema {
            Schema::Leaf { name, kwargs } => {
                let kwargs = kwargs
                    .iter()
                    .map(|(k, v)| {
                        let kwarg = match v {
                            KwargSchema::Value(value) => Kwarg::Value(value.clone()),
                            KwargSchema::Schema(inner) => Kwarg::Schema(Box::new(Node::from_schema(inner))),
                        };
                        (k.clone(), kwarg)
                    })
                    .collect();
                Node::Leaf(LeafNode::new(name.clone(), kwargs))
            }
            Schema::Sequence { slot, steps } => Node::Sequential(SequentialNode {
                slot: *slot,
                children: steps.iter().map(Node::from_schema).collect(),
                state: NodeState::Uninitialized,
            }),
            Schema::Concat(branches) => Node::Concat(ConcatNode {
                children: branches.iter().map(Node::from_schema).collect(),
                state: NodeState::Uninitialized,
            }),
        }
    }

    /// The schema this tree currently represents, including parameter changes
    pub fn to_schema(&self) -> Schema {
        match self {
            Node::Leaf(leaf) => Schema::Leaf {
                name: leaf.backend_name.clone(),
                kwargs: leaf
                    .kwargs
                    .iter()
                    .map(|(k, v)| {
                        let kwarg = match v {
                            Kwarg::Value(value) => KwargSchema::Value(value.clone()),
                            Kwarg::Schema(inner) => KwargSchema::Schema(inner.to_schema()),
                        };
                        (k.clone(), kwarg)
                    })
                    .collect(),
            },
            Node::Sequential(seq) => Schema::Sequence {
                slot: seq.slot,
                steps: seq.children.iter().map(Node::to_schema).collect(),
            },
            Node::Concat(concat) => Schema::Concat(concat.children.iter().map(Node::to_schema).collect()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Sequential(_) => NodeKind::Sequential,
            Node::Concat(_) => NodeKind::Concat,
        }
    }

    pub fn state(&self) -> NodeState {
        match self {
            Node::Leaf(leaf) => leaf.state,
            Node::Sequential(seq) => seq.state,
            Node::Concat(concat) => concat.state,
        }
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        match self {
            Node::Leaf(leaf) => leaf.state = state,
            Node::Sequential(seq) => seq.state = state,
            Node::Concat(concat) => concat.state = state,
        }
    }

    /// Ordered children; empty for leaves
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Leaf(_) => &[],
            Node::Sequential(seq) => &seq.children,
            Node::Concat(concat) => &concat.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        match self {
            Node::Leaf(_) => &mut [],
            Node::Sequential(seq) => &mut seq.children,
            Node::Concat(concat) => &mut concat.children,
        }
    }

    /// Slot name under which children are addressed
    pub fn child_slot(&self) -> Option<Slot> {
        match self {
            Node::Leaf(_) => None,
            Node::Sequential(seq) => Some(seq.slot),
            Node::Concat(_) => Some(Slot::Concat),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Backend identifier for leaves, node kind otherwise
    pub fn label(&self) -> &str {
        match self {
            Node::Leaf(leaf) => &leaf.backend_name,
            other => other.kind().as_str(),
        }
    }

    /// Number of nodes in the tree, nested schema kwargs included
    pub fn size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => {
                1 + leaf
                    .kwargs
                    .values()
                    .map(|k| match k {
                        Kwarg::Schema(inner) => inner.size(),
                        Kwarg::Value(_) => 0,
                    })
                    .sum::<usize>()
            }
            other => 1 + other.children().iter().map(Node::size).sum::<usize>(),
        }
    }

    /// Whether any leaf in the tree holds a live backend
    pub fn has_live_backend(&self) -> bool {
        match self {
            Node::Leaf(leaf) => {
                leaf.backend.is_some()
                    || leaf.kwargs.values().any(|k| match k {
                        Kwarg::Schema(inner) => inner.has_live_backend(),
                        Kwarg::Value(_) => false,
                    })
            }
            other => other.children().iter().any(Node::has_live_backend),
        }
    }
}
