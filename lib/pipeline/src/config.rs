use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use vecflow_core::{Error, Result};
use vecflow_schema::{parse, Schema};

/// Execution switches for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Create backends on first use instead of at build time
    pub lazy: bool,
    /// Run concat branches on the rayon pool
    pub parallel_concat: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lazy: true,
            parallel_concat: false,
        }
    }
}

/// A schema plus its execution config, as stored in a JSON document:
///
/// ```json
/// {"schema": ["tfidf", "normalize"], "config": {"lazy": false}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub schema: Schema,
    #[serde(default)]
    pub config: PipelineConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    schema: Value,
    #[serde(default)]
    config: PipelineConfig,
}

impl PipelineSpec {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            config: PipelineConfig::default(),
        }
    }

    /// Parse a spec document. Schema shape errors surface as
    /// [`Error::Schema`] with the offending location.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawSpec = serde_json::from_str(text)?;
        Ok(Self {
            schema: parse(&raw.schema)?,
            config: raw.config,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert!(config.lazy);
        assert!(!config.parallel_concat);
        let partial: PipelineConfig = serde_json::from_str(r#"{"parallel_concat": true}"#).unwrap();
        assert!(partial.lazy);
        assert!(partial.parallel_concat);
    }

    #[test]
    fn test_spec_from_json_str() {
        let spec = PipelineSpec::from_json_str(r#"{"schema": ["tfidf", "normalize"], "config": {"lazy": false}}"#)
            .unwrap();
        assert_eq!(spec.schema.leaf_names(), vec!["tfidf", "normalize"]);
        assert!(!spec.config.lazy);
    }

    #[test]
    fn test_spec_config_optional() {
        let spec = PipelineSpec::from_json_str(r#"{"schema": "hashing"}"#).unwrap();
        assert_eq!(spec.config, PipelineConfig::default());
    }

    #[test]
    fn test_spec_reports_schema_errors() {
        let err = PipelineSpec::from_json_str(r#"{"schema": ["tfidf"]}"#).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        let err = PipelineSpec::from_json_str(r#"{"schema": "tfidf", "extra": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_spec_from_file_roundtrip() {
        let spec = PipelineSpec {
            schema: parse(&serde_json::json!({"concat": ["tfidf", ["hashing", {"n_features": 16}]]})).unwrap(),
            config: PipelineConfig {
                lazy: true,
                parallel_concat: true,
            },
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(spec.to_json_string().unwrap().as_bytes()).unwrap();
        let loaded = PipelineSpec::from_file(file.path()).unwrap();
        assert_eq!(loaded, spec);
    }

    #[test]
    fn test_spec_from_missing_file() {
        let err = PipelineSpec::from_file("/nonexistent/vecflow/spec.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
