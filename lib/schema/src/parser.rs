//! Structural parser
//!
//! Resolution rules, tried in this order:
//! 1. a string is a leaf identifier with no kwargs
//! 2. `[identifier, {kwargs}]` is a leaf with kwargs, unless the mapping is
//!    itself a `concat`/`transform` composite
//! 3. any other list of two or more entries is a sequential chain
//! 4. `{"concat": [...]}` is a fan-out
//! 5. `{"transform": [...]}` is an explicit sequential chain
//!
//! Anything else is rejected with a [`SchemaError`] naming the fragment and its
//! position. Identifiers are not checked against any registry here.

use crate::schema::{KwargSchema, Schema, SchemaError, Slot, PATH_SEPARATOR};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Mapping key introducing a fan-out
pub const CONCAT_KEY: &str = "concat";

/// Mapping key introducing an explicit chain
pub const TRANSFORM_KEY: &str = "transform";

/// Kwarg whose value is parsed as a nested schema
pub const SCHEMA_KWARG: &str = "schema";

/// Parse a configuration literal into a schema tree
pub fn parse(value: &Value) -> Result<Schema, SchemaError> {
    parse_at(value, "$")
}

fn parse_at(value: &Value, path: &str) -> Result<Schema, SchemaError> {
    match value {
        Value::String(name) => Ok(Schema::leaf(parse_identifier(name, value, path)?)),
        Value::Array(items) => parse_list(items, value, path),
        Value::Object(map) => parse_composite(map, value, path),
        _ => Err(SchemaError::new(
            path,
            value,
            "expected an identifier, a list or a single-key mapping",
        )),
    }
}

fn parse_identifier(name: &str, value: &Value, path: &str) -> Result<String, SchemaError> {
    if name.trim().is_empty() {
        return Err(SchemaError::new(path, value, "backend identifier cannot be empty"));
    }
    Ok(name.to_string())
}

fn parse_list(items: &[Value], value: &Value, path: &str) -> Result<Schema, SchemaError> {
    if let [Value::String(name), Value::Object(kwargs)] = items {
        if !is_composite_mapping(kwargs) {
            let name = parse_identifier(name, &items[0], &format!("{}[0]", path))?;
            let kwargs = parse_kwargs(kwargs, &format!("{}[1]", path))?;
            return Ok(Schema::Leaf { name, kwargs });
        }
    }

    if items.len() < 2 {
        return Err(SchemaError::new(
            path,
            value,
            "a bare list needs at least two steps; wrap a single step as {\"transform\": [...]}",
        ));
    }

    Ok(Schema::Sequence {
        slot: Slot::Transformations,
        steps: parse_steps(items, path)?,
    })
}

fn parse_composite(map: &Map<String, Value>, value: &Value, path: &str) -> Result<Schema, SchemaError> {
    let mut entries = map.iter();
    let (key, inner) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(SchemaError::new(
                path,
                value,
                "a mapping must have exactly one key, `concat` or `transform`",
            ))
        }
    };

    let inner_path = format!("{}.{}", path, key);
    let items = match inner {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(SchemaError::new(
                &inner_path,
                inner,
                "expected a non-empty list of steps",
            ))
        }
    };

    match key.as_str() {
        CONCAT_KEY => Ok(Schema::Concat(parse_steps(items, &inner_path)?)),
        TRANSFORM_KEY => Ok(Schema::Sequence {
            slot: Slot::Transform,
            steps: parse_steps(items, &inner_path)?,
        }),
        _ => Err(SchemaError::new(
            path,
            value,
            format!("unknown mapping key `{}`; expected `concat` or `transform`", key),
        )),
    }
}

fn parse_steps(items: &[Value], path: &str) -> Result<Vec<Schema>, SchemaError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_at(item, &format!("{}[{}]", path, i)))
        .collect()
}

fn parse_kwargs(
    map: &Map<String, Value>,
    path: &str,
) -> Result<BTreeMap<String, KwargSchema>, SchemaError> {
    let mut kwargs = BTreeMap::new();
    for (key, value) in map {
        let kwarg_path = format!("{}.{}", path, key);
        if key.is_empty() || key.contains(PATH_SEPARATOR) {
            return Err(SchemaError::new(
                &kwarg_path,
                value,
                format!("kwarg name `{}` must be non-empty and must not contain `{}`", key, PATH_SEPARATOR),
            ));
        }
        let kwarg = if key == SCHEMA_KWARG {
            KwargSchema::Schema(parse_at(value, &kwarg_path)?)
        } else {
            KwargSchema::Value(value.clone())
        };
        kwargs.insert(key.clone(), kwarg);
    }
    Ok(kwargs)
}

fn is_composite_mapping(map: &Map<String, Value>) -> bool {
    map.len() == 1 && (map.contains_key(CONCAT_KEY) || map.contains_key(TRANSFORM_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_is_leaf() {
        assert_eq!(parse(&json!("tfidf")).unwrap(), Schema::leaf("tfidf"));
    }

    #[test]
    fn test_pair_is_leaf_with_kwargs() {
        let schema = parse(&json!(["nmf", {"n_components": 30}])).unwrap();
        assert_eq!(schema, Schema::leaf_with("nmf", [("n_components", json!(30))]));
    }

    #[test]
    fn test_empty_kwargs_pair() {
        let schema = parse(&json!(["not_a_real_embedding", {}])).unwrap();
        assert_eq!(schema, Schema::leaf("not_a_real_embedding"));
    }

    #[test]
    fn test_list_is_sequence() {
        let schema = parse(&json!(["tfidf", ["nmf", {"n_components": 30}]])).unwrap();
        assert_eq!(
            schema,
            Schema::Sequence {
                slot: Slot::Transformations,
                steps: vec![
                    Schema::leaf("tfidf"),
                    Schema::leaf_with("nmf", [("n_components", json!(30))]),
                ],
            }
        );
    }

    #[test]
    fn test_pair_of_identifiers_is_sequence() {
        let schema = parse(&json!(["tfidf", "normalize"])).unwrap();
        assert!(matches!(schema, Schema::Sequence { ref steps, .. } if steps.len() == 2));
    }

    #[test]
    fn test_identifier_followed_by_concat_is_sequence() {
        let schema = parse(&json!(["tfidf", {"concat": ["scale", "normalize"]}])).unwrap();
        match schema {
            Schema::Sequence { steps, .. } => {
                assert_eq!(steps[0], Schema::leaf("tfidf"));
                assert!(matches!(steps[1], Schema::Concat(ref b) if b.len() == 2));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_of_transform_chains() {
        let schema = parse(&json!({"concat": [
            {"transform": ["tfidf", "normalize"]},
            {"transform": ["hashing", ["random_projection", {"n_components": 4}]]}
        ]}))
        .unwrap();
        match schema {
            Schema::Concat(branches) => {
                assert_eq!(branches.len(), 2);
                for branch in branches {
                    assert!(matches!(branch, Schema::Sequence { slot: Slot::Transform, .. }));
                }
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_kwarg_is_parsed() {
        let schema = parse(&json!(["compound", {
            "normalize": true,
            "schema": {"concat": ["tfidf", "hashing"]}
        }]))
        .unwrap();
        match schema {
            Schema::Leaf { kwargs, .. } => {
                assert_eq!(kwargs["normalize"], KwargSchema::Value(json!(true)));
                assert!(matches!(kwargs["schema"], KwargSchema::Schema(Schema::Concat(_))));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_nested_schema_kwarg_reports_path() {
        let err = parse(&json!(["compound", {"schema": 12}])).unwrap_err();
        assert_eq!(err.path, "$[1].schema");
    }

    #[test]
    fn test_single_element_list_rejected() {
        let err = parse(&json!(["tfidf"])).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.contains("at least two"));
    }

    #[test]
    fn test_unknown_mapping_key_rejected() {
        let err = parse(&json!({"union": ["a", "b"]})).unwrap_err();
        assert!(err.message.contains("union"));
    }

    #[test]
    fn test_multi_key_mapping_rejected() {
        assert!(parse(&json!({"concat": ["a"], "transform": ["b"]})).is_err());
    }

    #[test]
    fn test_empty_concat_rejected() {
        let err = parse(&json!({"concat": []})).unwrap_err();
        assert_eq!(err.path, "$.concat");
    }

    #[test]
    fn test_error_path_points_into_nesting() {
        let err = parse(&json!(["tfidf", {"concat": ["a", 3]}])).unwrap_err();
        assert_eq!(err.path, "$[1].concat[1]");
        assert_eq!(err.fragment, "3");
    }

    #[test]
    fn test_scalar_rejected() {
        assert!(parse(&json!(42)).is_err());
        assert!(parse(&json!(null)).is_err());
        assert!(parse(&json!("")).is_err());
    }

    #[test]
    fn test_kwarg_with_separator_rejected() {
        let err = parse(&json!(["tfidf", {"max__features": 3}])).unwrap_err();
        assert_eq!(err.path, "$[1].max__features");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let literal = json!(["tfidf", {"concat": [["scale", {"with_mean": false}], "normalize"]}]);
        assert_eq!(parse(&literal).unwrap(), parse(&literal).unwrap());
    }

    #[test]
    fn test_to_value_reparses_identically() {
        let literal = json!([
            ["tfidf", {"max_features": 100}],
            {"concat": [{"transform": ["scale", "normalize"]}, "normalize"]}
        ]);
        let schema = parse(&literal).unwrap();
        assert_eq!(schema.to_value(), literal);
        assert_eq!(parse(&schema.to_value()).unwrap(), schema);
    }
}
