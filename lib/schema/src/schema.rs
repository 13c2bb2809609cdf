//! Schema tree definitions
//!
//! The typed form of a pipeline configuration. Every [`Schema`] can be turned
//! back into the literal it was parsed from with [`Schema::to_value`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Separator between the segments of a hierarchical parameter path.
pub const PATH_SEPARATOR: &str = "__";

/// Maximum number of characters of an offending fragment kept in errors
const FRAGMENT_LIMIT: usize = 80;

/// A parsed pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A single named backend with its kwargs
    Leaf {
        name: String,
        kwargs: BTreeMap<String, KwargSchema>,
    },
    /// An ordered chain; output of step `i` feeds step `i + 1`
    Sequence { slot: Slot, steps: Vec<Schema> },
    /// A fan-out over the same input; outputs are concatenated in order
    Concat(Vec<Schema>),
}

/// A kwarg value: either a plain literal or a nested schema
#[derive(Debug, Clone, PartialEq)]
pub enum KwargSchema {
    Value(Value),
    Schema(Schema),
}

/// Named slots used when addressing children in parameter paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// The root node of a pipeline
    Embedding,
    /// Children of a bare-list chain
    Transformations,
    /// Children of a fan-out
    Concat,
    /// Children of an explicit `{"transform": [...]}` chain
    Transform,
}

impl Slot {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Slot::Embedding => "embedding",
            Slot::Transformations => "transformations",
            Slot::Concat => "concat",
            Slot::Transform => "transform",
        }
    }

    /// Parse a path segment into a slot
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "embedding" => Some(Slot::Embedding),
            "transformations" => Some(Slot::Transformations),
            "concat" => Some(Slot::Concat),
            "transform" => Some(Slot::Transform),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Schema {
    /// A leaf with no kwargs
    pub fn leaf(name: impl Into<String>) -> Self {
        Schema::Leaf {
            name: name.into(),
            kwargs: BTreeMap::new(),
        }
    }

    /// A leaf with plain literal kwargs
    pub fn leaf_with<K, I>(name: impl Into<String>, kwargs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Schema::Leaf {
            name: name.into(),
            kwargs: kwargs
                .into_iter()
                .map(|(k, v)| (k.into(), KwargSchema::Value(v)))
                .collect(),
        }
    }

    /// Parse a JSON document into a schema
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text).map_err(|e| SchemaError {
            path: "$".to_string(),
            fragment: truncate_fragment(text),
            message: format!("not valid JSON: {}", e),
        })?;
        crate::parser::parse(&value)
    }

    /// Backend identifiers in depth-first order, including nested schema kwargs
    pub fn leaf_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_leaf_names(&mut names);
        names
    }

    fn collect_leaf_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Schema::Leaf { name, kwargs } => {
                names.push(name.as_str());
                for kwarg in kwargs.values() {
                    if let KwargSchema::Schema(inner) = kwarg {
                        inner.collect_leaf_names(names);
                    }
                }
            }
            Schema::Sequence { steps, .. } => steps.iter().for_each(|s| s.collect_leaf_names(names)),
            Schema::Concat(branches) => branches.iter().for_each(|b| b.collect_leaf_names(names)),
        }
    }

    /// Convert back into the literal configuration shape
    pub fn to_value(&self) -> Value {
        match self {
            Schema::Leaf { name, kwargs } if kwargs.is_empty() => Value::String(name.clone()),
            Schema::Leaf { name, kwargs } => {
                let map = kwargs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect::<serde_json::Map<_, _>>();
                Value::Array(vec![Value::String(name.clone()), Value::Object(map)])
            }
            Schema::Sequence { slot: Slot::Transform, steps } => {
                let mut map = serde_json::Map::new();
                map.insert(
                    Slot::Transform.as_str().to_string(),
                    Value::Array(steps.iter().map(Schema::to_value).collect()),
                );
                Value::Object(map)
            }
            Schema::Sequence { steps, .. } => {
                Value::Array(steps.iter().map(Schema::to_value).collect())
            }
            Schema::Concat(branches) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    Slot::Concat.as_str().to_string(),
                    Value::Array(branches.iter().map(Schema::to_value).collect()),
                );
                Value::Object(map)
            }
        }
    }
}

impl KwargSchema {
    pub fn to_value(&self) -> Value {
        match self {
            KwargSchema::Value(v) => v.clone(),
            KwargSchema::Schema(s) => s.to_value(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::parser::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// A configuration fragment that matches none of the schema shapes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid schema at {path}: {message} (got {fragment})")]
pub struct SchemaError {
    /// Locator of the fragment, e.g. `$[0].concat[2]`
    pub path: String,
    /// Compact JSON of the offending fragment
    pub fragment: String,
    pub message: String,
}

impl SchemaError {
    pub(crate) fn new(path: &str, fragment: &Value, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            fragment: truncate_fragment(&fragment.to_string()),
            message: message.into(),
        }
    }
}

fn truncate_fragment(text: &str) -> String {
    match text.char_indices().nth(FRAGMENT_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
