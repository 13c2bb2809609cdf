//! Row normalizer (stateless)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, ParamReader, Params};

pub const NAME: &str = "normalize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    #[default]
    L2,
    Max,
}

impl Norm {
    fn of(&self, row: &[f32]) -> f32 {
        match self {
            Norm::L1 => row.iter().map(|x| x.abs()).sum(),
            Norm::L2 => row.iter().map(|x| x * x).sum::<f32>().sqrt(),
            Norm::Max => row.iter().fold(0.0f32, |acc, x| acc.max(x.abs())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    norm: Norm,
}

impl Normalizer {
    pub fn new(norm: Norm) -> Self {
        Self { norm }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(params, &["norm"])?;
        let norm = match reader.choice("norm", "l2", &["l1", "l2", "max"])? {
            "l1" => Norm::L1,
            "max" => Norm::Max,
            _ => Norm::L2,
        };
        Ok(Self::new(norm))
    }
}

impl Backend for Normalizer {
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
        let mut matrix = data.as_dense()?.clone();
        for i in 0..matrix.n_rows() {
            let row = matrix.row_mut(i);
            let norm = self.norm.of(row);
            if norm > f32::EPSILON {
                row.iter_mut().for_each(|x| *x /= norm);
            }
        }
        Ok(matrix.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecflow_core::Matrix;

    fn input() -> Features {
        Matrix::from_rows(vec![vec![3.0, -4.0], vec![0.0, 0.0]])
            .unwrap()
            .into()
    }

    #[test]
    fn test_norm_serde_names() {
        assert_eq!(serde_json::to_value(Norm::Max).unwrap(), serde_json::json!("max"));
        let norm: Norm = serde_json::from_value(serde_json::json!("l1")).unwrap();
        assert_eq!(norm, Norm::L1);
    }

    #[test]
    fn test_l2() {
        let out = Normalizer::new(Norm::L2).transform(&input()).unwrap();
        assert_eq!(out.as_dense().unwrap().row(0), &[0.6, -0.8]);
        assert_eq!(out.as_dense().unwrap().row(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_l1_and_max() {
        let l1 = Normalizer::new(Norm::L1).transform(&input()).unwrap();
        assert!((l1.as_dense().unwrap().row(0)[0] - 3.0 / 7.0).abs() < 1e-6);
        let max = Normalizer::new(Norm::Max).transform(&input()).unwrap();
        assert_eq!(max.as_dense().unwrap().row(0), &[0.75, -1.0]);
    }

    #[test]
    fn test_text_input_rejected() {
        assert!(Normalizer::new(Norm::L2)
            .transform(&Features::text(&["a"]))
            .is_err());
    }
}
