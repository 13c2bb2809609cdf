//! Feature-hashing embedding
//!
//! Stateless: every word adds 2.0 and every distinct character trigram adds
//! 1.0 to its hashed bucket, then each row is normalized to unit length.

use crate::text::{hash_bucket, tokenize, trigrams};
use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, Matrix, ParamReader, Params};

pub const NAME: &str = "hashing";

/// Default number of hashed buckets
pub const DEFAULT_N_FEATURES: usize = 64;

#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    n_features: usize,
    trigrams: bool,
}

impl HashingEmbedding {
    pub fn new(n_features: usize, trigrams: bool) -> Self {
        Self {
            n_features,
            trigrams,
        }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(params, &["n_features", "trigrams"])?;
        let n_features = reader.usize("n_features", DEFAULT_N_FEATURES)?;
        if n_features == 0 {
            return Err(BackendError::InvalidParameter {
                name: "n_features".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self::new(n_features, reader.bool("trigrams", true)?))
    }

    fn embed(&self, text: &str, row: &mut [f32]) {
        let normalized = text.to_lowercase();
        if self.trigrams {
            for trigram in trigrams(&normalized) {
                row[hash_bucket(&trigram, self.n_features)] += 1.0;
            }
        }
        for word in tokenize(&normalized, false) {
            row[hash_bucket(&word, self.n_features)] += 2.0;
        }
    }
}

impl Backend for HashingEmbedding {
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
        let docs = data.as_text()?;
        let mut matrix = Matrix::zeros(docs.len(), self.n_features);
        for (i, doc) in docs.iter().enumerate() {
            self.embed(doc, matrix.row_mut(i));
        }
        matrix.normalize_rows();
        Ok(matrix.into())
    }
}
