//! Parameter routing
//!
//! Flattens a tree into `__`-delimited kwarg paths and routes updates back to
//! the owning leaf. Addressing rules, relative to the node the path starts at:
//!
//! | node        | segments                                         |
//! |-------------|--------------------------------------------------|
//! | leaf        | `<kwarg>`, or `<schema kwarg>__<nested path>`    |
//! | sequential  | `transformations__<i>__...` / `transform__<i>__...` |
//! | concat      | `concat__<i>__...`                               |
//!
//! Updates are validated as a batch before any of them is applied. Every
//! applied change resets the target leaf and all of its ancestors. Chain
//! stages after the changed one are reset too, since their fitted state
//! was learned from the old output. Concat siblings keep their backends.

use crate::node::{Kwarg, LeafNode, Node, NodeState};
use crate::path::{self, Segments};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::debug;
use vecflow_core::{Error, Result};
use vecflow_schema::parse;

/// Flat view of every terminal kwarg in a tree
pub type ParamMap = BTreeMap<String, Value>;

/// One update of a batch; `path` is reported in errors, `relative` is resolved
pub(crate) struct Update<'a> {
    pub path: &'a str,
    pub relative: &'a str,
    pub value: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Child(usize),
    Nested(String),
}

struct Change {
    path: String,
    steps: SmallVec<[Step; 4]>,
    kwarg: String,
    replacement: Kwarg,
}

impl Node {
    /// Every plain kwarg in the tree keyed by its node-relative path
    pub fn get_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        collect(self, "", &mut params);
        params
    }

    /// Validate and apply a batch of updates keyed by node-relative paths.
    ///
    /// Either every update is applied or none is. Returns how many kwargs
    /// actually changed; writing a value equal to the current one is a no-op
    /// and does not invalidate anything.
    pub fn set_params(&mut self, params: &ParamMap) -> Result<usize> {
        let updates = params.iter().map(|(key, value)| Update {
            path: key,
            relative: key,
            value,
        });
        apply_updates(self, updates)
    }

    /// Node reached by a node-relative path; the empty path is `self`
    pub fn node_at(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(self);
        }
        let segments = path::split(path);
        let mut current = self;
        let mut i = 0;
        while i < segments.len() {
            match current {
                Node::Leaf(leaf) => match leaf.kwargs.get(segments[i]) {
                    Some(Kwarg::Schema(inner)) => {
                        current = inner;
                        i += 1;
                    }
                    _ => return None,
                },
                composite => {
                    let slot = composite.child_slot()?;
                    if segments[i] != slot.as_str() {
                        return None;
                    }
                    let index = path::parse_index(segments.get(i + 1)?)?;
                    current = composite.children().get(index)?;
                    i += 2;
                }
            }
        }
        Some(current)
    }
}

pub(crate) fn collect(node: &Node, prefix: &str, out: &mut ParamMap) {
    match node {
        Node::Leaf(leaf) => {
            for (name, kwarg) in &leaf.kwargs {
                let key = path::join(prefix, name);
                match kwarg {
                    Kwarg::Value(value) => {
                        out.insert(key, value.clone());
                    }
                    Kwarg::Schema(inner) => collect(inner, &key, out),
                }
            }
        }
        composite => {
            if let Some(slot) = composite.child_slot() {
                for (i, child) in composite.children().iter().enumerate() {
                    collect(child, &path::child(prefix, slot.as_str(), i), out);
                }
            }
        }
    }
}

pub(crate) fn apply_updates<'a>(node: &mut Node, updates: impl IntoIterator<Item = Update<'a>>) -> Result<usize> {
    let mut resolved: Vec<&'a str> = Vec::new();
    let mut changes = Vec::new();

    for update in updates {
        if let Some(change) = plan(node, &update)? {
            changes.push(change);
        }
        resolved.push(update.relative);
        check_conflicts(&resolved, update.path)?;
    }

    let applied = changes.len();
    for change in changes {
        debug!(path = %change.path, "applying parameter change");
        apply(node, &change.steps, change.kwarg, change.replacement, &change.path)?;
    }
    Ok(applied)
}

/// Resolve one update, returning `None` when it would not change anything
fn plan(root: &Node, update: &Update<'_>) -> Result<Option<Change>> {
    let segments = path::split(update.relative);
    let (steps, leaf, kwarg) = resolve(root, &segments, update.path)?;

    let replacement = match leaf.kwargs.get(kwarg) {
        Some(Kwarg::Value(current)) if current == update.value => return Ok(None),
        Some(Kwarg::Value(_)) => Kwarg::Value(update.value.clone()),
        Some(Kwarg::Schema(current)) => {
            let schema = parse(update.value)?;
            if schema == current.to_schema() {
                return Ok(None);
            }
            Kwarg::Schema(Box::new(Node::from_schema(&schema)))
        }
        None => return Err(Error::parameter_path(update.path, kwarg, "kwarg vanished during resolution")),
    };

    Ok(Some(Change {
        path: update.path.to_string(),
        steps,
        kwarg: kwarg.to_string(),
        replacement,
    }))
}

fn resolve<'n, 's>(
    root: &'n Node,
    segments: &Segments<'s>,
    full_path: &str,
) -> Result<(SmallVec<[Step; 4]>, &'n LeafNode, &'s str)> {
    let err = |segment: &str, reason: String| Error::parameter_path(full_path, segment, reason);
    let mut steps = SmallVec::new();
    let mut current = root;
    let mut i = 0;

    loop {
        match current {
            Node::Leaf(leaf) => {
                let segment = match segments.get(i) {
                    Some(s) if !s.is_empty() => *s,
                    Some(_) => return Err(err("", "empty path segment".to_string())),
                    None => {
                        return Err(err(
                            "<end>",
                            format!("path stops at leaf '{}' without naming a kwarg", leaf.backend_name),
                        ))
                    }
                };
                let Some(kwarg) = leaf.kwargs.get(segment) else {
                    return Err(err(segment, missing_kwarg(leaf, segment)));
                };
                if i + 1 == segments.len() {
                    return Ok((steps, leaf, segment));
                }
                match kwarg {
                    Kwarg::Schema(inner) => {
                        steps.push(Step::Nested(segment.to_string()));
                        current = inner;
                        i += 1;
                    }
                    Kwarg::Value(_) => {
                        return Err(err(
                            segments[i + 1],
                            format!("kwarg '{segment}' of '{}' holds a plain value", leaf.backend_name),
                        ))
                    }
                }
            }
            composite => {
                let kind = composite.kind().as_str();
                let Some(slot) = composite.child_slot() else {
                    return Err(err("<end>", format!("{kind} node has no children")));
                };
                let Some(&segment) = segments.get(i) else {
                    return Err(err("<end>", format!("path stops at a {kind} node")));
                };
                if segment != slot.as_str() {
                    return Err(err(segment, format!("a {kind} node addresses its children as '{slot}'")));
                }
                let Some(&index_segment) = segments.get(i + 1) else {
                    return Err(err("<end>", format!("missing child index after '{slot}'")));
                };
                let Some(index) = path::parse_index(index_segment) else {
                    return Err(err(index_segment, "child index must be a non-negative integer".to_string()));
                };
                let count = composite.children().len();
                let Some(child) = composite.children().get(index) else {
                    return Err(err(
                        index_segment,
                        format!("index out of range for a {kind} node with {count} children"),
                    ));
                };
                steps.push(Step::Child(index));
                current = child;
                i += 2;
            }
        }
    }
}

fn missing_kwarg(leaf: &LeafNode, segment: &str) -> String {
    if leaf.kwargs.is_empty() {
        format!("backend '{}' has no kwargs", leaf.backend_name)
    } else {
        let known: Vec<&str> = leaf.kwargs.keys().map(String::as_str).collect();
        format!(
            "backend '{}' has no kwarg '{segment}' (kwargs: {})",
            leaf.backend_name,
            known.join(", ")
        )
    }
}

/// Reject a batch that replaces a nested schema and also writes inside it
fn check_conflicts(resolved: &[&str], full_path: &str) -> Result<()> {
    let Some((last, earlier)) = resolved.split_last() else {
        return Ok(());
    };
    for other in earlier {
        let (outer, inner) = if last.len() < other.len() { (*last, *other) } else { (*other, *last) };
        if let Some(rest) = inner.strip_prefix(outer).and_then(|r| r.strip_prefix(vecflow_schema::PATH_SEPARATOR)) {
            let segment = rest.split(vecflow_schema::PATH_SEPARATOR).next().unwrap_or(rest);
            return Err(Error::parameter_path(
                full_path,
                segment,
                format!("'{inner}' lies inside '{outer}', which is replaced in the same batch"),
            ));
        }
    }
    Ok(())
}

fn invalidate(node: &mut Node) {
    match node {
        Node::Leaf(leaf) => leaf.reset(),
        other => other.set_state(NodeState::Uninitialized),
    }
}

/// Reset `node` and everything below it, nested schema kwargs included
fn reset_subtree(node: &mut Node) {
    match node {
        Node::Leaf(leaf) => {
            leaf.reset();
            for kwarg in leaf.kwargs.values_mut() {
                if let Kwarg::Schema(inner) = kwarg {
                    reset_subtree(inner);
                }
            }
        }
        other => {
            other.set_state(NodeState::Uninitialized);
            other.children_mut().iter_mut().for_each(reset_subtree);
        }
    }
}

fn apply(node: &mut Node, steps: &[Step], kwarg: String, replacement: Kwarg, full_path: &str) -> Result<()> {
    invalidate(node);
    match (steps.split_first(), node) {
        (None, Node::Leaf(leaf)) => {
            leaf.kwargs.insert(kwarg, replacement);
            Ok(())
        }
        (Some((Step::Child(index), rest)), composite) => {
            let chained = matches!(composite, Node::Sequential(_));
            let children = composite.children_mut();
            if *index >= children.len() {
                return Err(Error::parameter_path(full_path, index.to_string(), "child disappeared"));
            }
            let (head, downstream) = children.split_at_mut(*index + 1);
            if chained && !downstream.is_empty() {
                debug!(path = full_path, stages = downstream.len(), "resetting downstream chain stages");
                downstream.iter_mut().for_each(reset_subtree);
            }
            apply(&mut head[*index], rest, kwarg, replacement, full_path)
        }
        (Some((Step::Nested(name), rest)), Node::Leaf(leaf)) => match leaf.kwargs.get_mut(name) {
            Some(Kwarg::Schema(inner)) => apply(inner, rest, kwarg, replacement, full_path),
            _ => Err(Error::parameter_path(full_path, name.as_str(), "nested schema disappeared")),
        },
        _ => Err(Error::parameter_path(full_path, kwarg, "path no longer resolves to a leaf")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vecflow_schema::parse;

    fn tree(literal: Value) -> Node {
        Node::from_schema(&parse(&literal).unwrap())
    }

    fn params(pairs: &[(&str, Value)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_get_params_paths() {
        let node = tree(json!([
            ["tfidf", {"min_df": 2}],
            {"concat": ["scale", ["normalize", {"norm": "l1"}]]}
        ]));
        let flat = node.get_params();
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["transformations__0__min_df", "transformations__1__concat__1__norm"]
        );
        assert_eq!(flat["transformations__1__concat__1__norm"], json!("l1"));
    }

    #[test]
    fn test_get_params_explicit_transform_slot() {
        let node = tree(json!({"transform": [["hashing", {"n_features": 8}], "normalize"]}));
        assert_eq!(node.get_params(), params(&[("transform__0__n_features", json!(8))]));
    }

    #[test]
    fn test_get_params_descends_nested_schema() {
        let node = tree(json!(["compound", {
            "normalize": true,
            "schema": {"concat": [["hashing", {"n_features": 4}], "tfidf"]}
        }]));
        assert_eq!(
            node.get_params(),
            params(&[("normalize", json!(true)), ("schema__concat__0__n_features", json!(4))])
        );
    }

    #[test]
    fn test_get_params_leaf_without_kwargs_is_empty() {
        assert!(tree(json!("tfidf")).get_params().is_empty());
    }

    #[test]
    fn test_set_params_roundtrip() {
        let mut node = tree(json!([["tfidf", {"min_df": 2}], ["normalize", {"norm": "l1"}]]));
        let update = params(&[("transformations__1__norm", json!("max"))]);
        assert_eq!(node.set_params(&update).unwrap(), 1);
        assert_eq!(node.get_params()["transformations__1__norm"], json!("max"));
        assert_eq!(node.get_params()["transformations__0__min_df"], json!(2));
    }

    #[test]
    fn test_set_params_equal_value_is_noop() {
        let mut node = tree(json!([["tfidf", {"min_df": 2}], "scale"]));
        assert_eq!(node.set_params(&params(&[("transformations__0__min_df", json!(2))])).unwrap(), 0);
    }

    #[test]
    fn test_set_params_is_atomic() {
        let mut node = tree(json!([["tfidf", {"min_df": 2}], ["normalize", {"norm": "l1"}]]));
        let before = node.get_params();
        let batch = params(&[
            ("transformations__0__min_df", json!(5)),
            ("transformations__1__bogus", json!(1)),
        ]);
        assert!(node.set_params(&batch).is_err());
        assert_eq!(node.get_params(), before);
    }

    #[test]
    fn test_set_params_errors_name_segment() {
        let mut node = tree(json!([["tfidf", {"min_df": 2}], "scale"]));
        let cases = [
            ("concat__0__min_df", "concat"),
            ("transformations__7__min_df", "7"),
            ("transformations__x__min_df", "x"),
            ("transformations__01__min_df", "01"),
            ("transformations__0__max_df", "max_df"),
            ("transformations__0__min_df__deeper", "deeper"),
            ("transformations__0", "<end>"),
            ("transformations", "<end>"),
            ("transformations__1__with_mean", "with_mean"),
        ];
        for (key, expected) in cases {
            match node.set_params(&params(&[(key, json!(1))])) {
                Err(Error::ParameterPath { path, segment, .. }) => {
                    assert_eq!(path, key);
                    assert_eq!(segment, expected, "for {key}");
                }
                other => panic!("expected ParameterPath for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_set_params_replaces_nested_schema() {
        let mut node = tree(json!(["compound", {"schema": ["tfidf", "scale"]}]));
        let update = params(&[("schema", json!({"concat": ["tfidf", ["hashing", {"n_features": 4}]]}))]);
        assert_eq!(node.set_params(&update).unwrap(), 1);
        assert_eq!(node.get_params(), params(&[("schema__concat__1__n_features", json!(4))]));
        assert!(node.node_at("schema__concat__1").is_some());
    }

    #[test]
    fn test_set_params_invalid_nested_schema() {
        let mut node = tree(json!(["compound", {"schema": ["tfidf", "scale"]}]));
        let err = node.set_params(&params(&[("schema", json!(42))])).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_set_params_rejects_conflicting_batch() {
        let mut node = tree(json!(["compound", {"schema": [["hashing", {"n_features": 4}], "scale"]}]));
        let batch = params(&[
            ("schema", json!(["tfidf", "scale"])),
            ("schema__transformations__0__n_features", json!(8)),
        ]);
        assert!(matches!(node.set_params(&batch), Err(Error::ParameterPath { .. })));
        assert_eq!(node.get_params()["schema__transformations__0__n_features"], json!(4));
    }

    #[test]
    fn test_node_at() {
        let node = tree(json!([
            "tfidf",
            ["compound", {"schema": {"concat": ["hashing", "scale"]}}]
        ]));
        assert_eq!(node.node_at("").unwrap().label(), "sequential");
        assert_eq!(node.node_at("transformations__0").unwrap().label(), "tfidf");
        assert_eq!(node.node_at("transformations__1__schema").unwrap().label(), "concat");
        assert_eq!(node.node_at("transformations__1__schema__concat__1").unwrap().label(), "scale");
        assert!(node.node_at("transformations__2").is_none());
        assert!(node.node_at("concat__0").is_none());
    }

    #[test]
    fn test_conflict_check_ignores_shared_prefixes() {
        assert!(check_conflicts(&["transformations__1", "transformations__10__norm"], "p").is_ok());
        assert!(check_conflicts(&["schema", "schema__concat__0__n"], "p").is_err());
    }
}
