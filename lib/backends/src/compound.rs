//! Compound embedding
//!
//! Carries a nested `schema` kwarg. The pipeline runs that schema and hands
//! this backend the column-wise concatenation of its output; the backend only
//! optionally re-normalizes the combined rows.

use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, ParamReader, Params};

pub const NAME: &str = "compound";

#[derive(Debug, Clone)]
pub struct CompoundEmbedding {
    normalize: bool,
}

impl CompoundEmbedding {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(params, &["normalize"])?;
        Ok(Self::new(reader.bool("normalize", false)?))
    }
}

impl Backend for CompoundEmbedding {
    fn name(&self) -> &str {
        NAME
    }

    fn is_trainable(&self) -> bool {
        false
    }

    fn fit(&mut self, _data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        let mut matrix = match data {
            Features::Dense(m) => m.clone(),
            Features::Text(_) => {
                return Err(BackendError::InvalidInput(
                    "compound needs a `schema` kwarg producing dense features".to_string(),
                ))
            }
        };
        if self.normalize {
            matrix.normalize_rows();
        }
        Ok(matrix.into())
    }
}
