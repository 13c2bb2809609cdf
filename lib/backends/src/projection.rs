//! Seeded random projection for dimensionality reduction
//!
//! `fit` draws a sign matrix of shape `(n_features_in, n_components)` with
//! entries `±1 / sqrt(n_components)`. The same seed and input width always
//! yield the same projection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use vecflow_core::{Backend, BackendError, Features, Matrix, ParamReader, Params};

pub const NAME: &str = "random_projection";

pub const DEFAULT_N_COMPONENTS: usize = 8;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct RandomProjection {
    n_components: usize,
    seed: u64,
    components: Option<Matrix>,
}

impl RandomProjection {
    pub fn new(n_components: usize, seed: u64) -> Self {
        Self {
            n_components,
            seed,
            components: None,
        }
    }

    pub fn from_params(params: &Params) -> Result<Self, BackendError> {
        let reader = ParamReader::new(params, &["n_components", "seed"])?;
        let n_components = reader.usize("n_components", DEFAULT_N_COMPONENTS)?;
        if n_components == 0 {
            return Err(BackendError::InvalidParameter {
                name: "n_components".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self::new(n_components, reader.u64("seed", DEFAULT_SEED)?))
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

impl Backend for RandomProjection {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        let n_features = data.as_dense()?.n_cols();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let scale = 1.0 / (self.n_components as f32).sqrt();
        let values = (0..n_features * self.n_components)
            .map(|_| if rng.random_bool(0.5) { scale } else { -scale })
            .collect();
        self.components = Some(Matrix::new(values, n_features, self.n_components)?);
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        let components = self.components.as_ref().ok_or(BackendError::NotFitted)?;
        let matrix = data.as_dense()?;
        if matrix.n_cols() != components.n_rows() {
            return Err(BackendError::ShapeMismatch {
                expected: format!("{} features", components.n_rows()),
                actual: format!("{} features", matrix.n_cols()),
            });
        }

        let mut out = Matrix::zeros(matrix.n_rows(), self.n_components);
        for (i, row) in matrix.rows().enumerate() {
            let target = out.row_mut(i);
            for (k, x) in row.iter().enumerate() {
                if *x == 0.0 {
                    continue;
                }
                for (t, c) in target.iter_mut().zip(components.row(k)) {
                    *t += x * c;
                }
            }
        }
        Ok(out.into())
    }
}
