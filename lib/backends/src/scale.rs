//! Standard scaler (z-score per column)
//!
//! ```text
//! z = (x - mean) / std
//! ```
//!
//! Population standard deviation; constant columns keep a divisor of 1.

use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, Matrix, ParamReader, Params};

pub const NAME: &str = "scale";

#[derive(Debug, Clone)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
    mean: Vec<f32>,
    std: Vec<f32>,
    fitted: bool,
}

impl StandardScaler {
    pub fn new(with_mean: bool, with_std: bool) -> Self {
        Self {
            with_mean,
            with_std,
            mean: Vec::new(),
            std: Vec::new(),
            fitted: false,
        }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(params, &["with_mean", "with_std"])?;
        Ok(Self::new(
            reader.bool("with_mean", true)?,
            reader.bool("with_std", true)?,
        ))
    }

    fn column_stats(data: &Matrix) -> (Vec<f32>, Vec<f32>) {
        let (rows, cols) = data.shape();
        let n = rows as f32;
        let mut mean = vec![0.0f32; cols];
        for row in data.rows() {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut var = vec![0.0f32; cols];
        for row in data.rows() {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m) / n;
            }
        }
        (mean, var.into_iter().map(f32::sqrt).collect())
    }
}

impl Backend for StandardScaler {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        let matrix = data.as_dense()?;
        if matrix.n_rows() == 0 {
            return Err(BackendError::InvalidInput(
                "cannot fit scale on empty data".to_string(),
            ));
        }

        let (mean, std) = Self::column_stats(matrix);
        let cols = matrix.n_cols();
        self.mean = if self.with_mean { mean } else { vec![0.0; cols] };
        self.std = if self.with_std {
            std.into_iter()
                .map(|s| if s == 0.0 { 1.0 } else { s })
                .collect()
        } else {
            vec![1.0; cols]
        };
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        if !self.fitted {
            return Err(BackendError::NotFitted);
        }
        let mut matrix = data.as_dense()?.clone();
        if matrix.n_cols() != self.mean.len() {
            return Err(BackendError::ShapeMismatch {
                expected: format!("{} features", self.mean.len()),
                actual: format!("{} features", matrix.n_cols()),
            });
        }
        for i in 0..matrix.n_rows() {
            let row = matrix.row_mut(i);
            for ((x, m), s) in row.iter_mut().zip(&self.mean).zip(&self.std) {
                *x = (*x - m) / s;
            }
        }
        Ok(matrix.into())
    }
}
