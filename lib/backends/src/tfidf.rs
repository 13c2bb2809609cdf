//! TF-IDF embedding
//!
//! Learns a vocabulary and smoothed inverse document frequencies from the
//! training documents:
//!
//! ```text
//! idf(t) = ln((1 + n) / (1 + df(t))) + 1
//! ```
//!
//! Columns are the vocabulary terms in lexicographic order.

use crate::text::tokenize;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, Matrix, ParamReader, Params};

pub const NAME: &str = "tfidf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfidfConfig {
    /// Keep only the most frequent terms (by document frequency)
    pub max_features: Option<usize>,
    /// Drop terms appearing in fewer documents
    pub min_df: usize,
    pub lowercase: bool,
    /// Use `1 + ln(tf)` instead of raw counts
    pub sublinear_tf: bool,
    /// L2-normalize every row
    pub norm: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: None,
            min_df: 1,
            lowercase: true,
            sublinear_tf: false,
            norm: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Vocabulary {
    index: AHashMap<String, usize>,
    idf: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct TfidfEmbedding {
    config: TfidfConfig,
    vocabulary: Option<Vocabulary>,
}

impl TfidfEmbedding {
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: None,
        }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(
            params,
            &["max_features", "min_df", "lowercase", "sublinear_tf", "norm"],
        )?;
        let defaults = TfidfConfig::default();
        let config = TfidfConfig {
            max_features: reader.optional_usize("max_features")?,
            min_df: reader.usize("min_df", defaults.min_df)?,
            lowercase: reader.bool("lowercase", defaults.lowercase)?,
            sublinear_tf: reader.bool("sublinear_tf", defaults.sublinear_tf)?,
            norm: reader.bool("norm", defaults.norm)?,
        };
        if config.max_features == Some(0) {
            return Err(BackendError::InvalidParameter {
                name: "max_features".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self::new(config))
    }

    /// Number of learned terms, if fitted
    pub fn vocabulary_size(&self) -> Option<usize> {
        self.vocabulary.as_ref().map(|v| v.idf.len())
    }

    fn tokenize_all(&self, docs: &[String]) -> Vec<Vec<String>> {
        docs.iter().map(|d| tokenize(d, self.config.lowercase)).collect()
    }

    fn learn(&self, tokenized: &[Vec<String>]) -> Result<Vocabulary, BackendError> {
        if tokenized.is_empty() {
            return Err(BackendError::InvalidInput(
                "cannot fit tfidf on an empty batch".to_string(),
            ));
        }

        let mut dfs: AHashMap<&str, usize> = AHashMap::new();
        for tokens in tokenized {
            let unique: AHashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *dfs.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(&str, usize)> = dfs
            .into_iter()
            .filter(|(_, df)| *df >= self.config.min_df)
            .collect();
        if let Some(max) = self.config.max_features {
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            terms.truncate(max);
        }
        terms.sort_by(|a, b| a.0.cmp(b.0));

        if terms.is_empty() {
            return Err(BackendError::InvalidInput(
                "empty vocabulary: no term survives tokenization and min_df".to_string(),
            ));
        }

        let n_docs = tokenized.len() as f32;
        let idf = terms
            .iter()
            .map(|(_, df)| ((1.0 + n_docs) / (1.0 + *df as f32)).ln() + 1.0)
            .collect();
        let index = terms
            .into_iter()
            .enumerate()
            .map(|(i, (term, _))| (term.to_string(), i))
            .collect();

        Ok(Vocabulary { index, idf })
    }

    fn weigh(&self, vocabulary: &Vocabulary, tokenized: &[Vec<String>]) -> Matrix {
        let cols = vocabulary.idf.len();
        let mut matrix = Matrix::zeros(tokenized.len(), cols);
        for (i, tokens) in tokenized.iter().enumerate() {
            let row = matrix.row_mut(i);
            for token in tokens {
                if let Some(&col) = vocabulary.index.get(token) {
                    row[col] += 1.0;
                }
            }
            for (col, weight) in row.iter_mut().enumerate() {
                if *weight > 0.0 {
                    let tf = if self.config.sublinear_tf {
                        1.0 + weight.ln()
                    } else {
                        *weight
                    };
                    *weight = tf * vocabulary.idf[col];
                }
            }
        }
        if self.config.norm {
            matrix.normalize_rows();
        }
        matrix
    }
}

impl Backend for TfidfEmbedding {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        let tokenized = self.tokenize_all(data.as_text()?);
        self.vocabulary = Some(self.learn(&tokenized)?);
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        let vocabulary = self.vocabulary.as_ref().ok_or(BackendError::NotFitted)?;
        let tokenized = self.tokenize_all(data.as_text()?);
        Ok(self.weigh(vocabulary, &tokenized).into())
    }

    // Tokenizes once for both passes.
    fn fit_transform(
        &mut self,
        data: &Features,
        _labels: Option<&[Value]>,
    ) -> Result<Features, BackendError> {
        let tokenized = self.tokenize_all(data.as_text()?);
        let vocabulary = self.learn(&tokenized)?;
        let out = self.weigh(&vocabulary, &tokenized);
        self.vocabulary = Some(vocabulary);
        Ok(out.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Features {
        Features::text(&[
            "the cat sat on the mat",
            "the dog sat on the log",
            "cats and dogs",
        ])
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: TfidfConfig = serde_json::from_value(json!({"min_df": 2, "sublinear_tf": true})).unwrap();
        assert_eq!(config.min_df, 2);
        assert!(config.sublinear_tf);
        assert!(config.lowercase);
        assert_eq!(config.max_features, None);
    }

    #[test]
    fn test_fit_transform_shape() {
        let mut tfidf = TfidfEmbedding::new(TfidfConfig::default());
        let out = tfidf.fit_transform(&docs(), None).unwrap();
        let m = out.as_dense().unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(Some(m.n_cols()), tfidf.vocabulary_size());
    }

    #[test]
    fn test_fit_transform_matches_fit_then_transform() {
        let mut a = TfidfEmbedding::new(TfidfConfig::default());
        let mut b = TfidfEmbedding::new(TfidfConfig::default());
        let one_pass = a.fit_transform(&docs(), None).unwrap();
        b.fit(&docs(), None).unwrap();
        assert_eq!(one_pass, b.transform(&docs()).unwrap());
    }

    #[test]
    fn test_max_features_limits_columns() {
        let params: Params = serde_json::from_value(json!({"max_features": 2})).unwrap();
        let mut tfidf = TfidfEmbedding::from_params(&params).unwrap();
        let out = tfidf.fit_transform(&docs(), None).unwrap();
        assert_eq!(out.n_cols(), Some(2));
    }

    #[test]
    fn test_rows_are_unit_length() {
        let mut tfidf = TfidfEmbedding::new(TfidfConfig::default());
        let out = tfidf.fit_transform(&docs(), None).unwrap();
        for row in out.as_dense().unwrap().rows() {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unseen_terms_give_zero_row() {
        let mut tfidf = TfidfEmbedding::new(TfidfConfig::default());
        tfidf.fit(&docs(), None).unwrap();
        let out = tfidf.transform(&Features::text(&["zebra quokka"])).unwrap();
        assert!(out.as_dense().unwrap().row(0).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let tfidf = TfidfEmbedding::new(TfidfConfig::default());
        assert_eq!(tfidf.transform(&docs()), Err(BackendError::NotFitted));
    }

    #[test]
    fn test_dense_input_rejected() {
        let mut tfidf = TfidfEmbedding::new(TfidfConfig::default());
        let dense: Features = Matrix::zeros(2, 2).into();
        assert!(matches!(tfidf.fit(&dense, None), Err(BackendError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_kwarg() {
        let params: Params = serde_json::from_value(json!({"ngram_range": [1, 2]})).unwrap();
        assert!(TfidfEmbedding::from_params(&params).is_err());
    }
}
