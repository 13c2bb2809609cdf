use crate::backend::BackendError;
use serde::{Deserialize, Serialize};

/// A dense row-major feature matrix, one row per input document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Build a matrix from row-major data
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> Result<Self, BackendError> {
        if data.len() != rows * cols {
            return Err(BackendError::ShapeMismatch {
                expected: format!("{} values for a {}x{} matrix", rows * cols, rows, cols),
                actual: format!("{} values", data.len()),
            });
        }
        Ok(Self { data, rows, cols })
    }

    #[inline]
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a matrix from equally sized rows
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, BackendError> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(BackendError::ShapeMismatch {
                    expected: format!("{} columns", cols),
                    actual: format!("{} columns in row {}", row.len(), i),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: n_rows,
            cols,
        })
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Concatenate matrices column-wise, keeping the order of `parts`
    pub fn hconcat(parts: &[Matrix]) -> Result<Matrix, BackendError> {
        let rows = match parts.first() {
            Some(first) => first.rows,
            None => return Ok(Matrix::zeros(0, 0)),
        };
        if let Some(bad) = parts.iter().find(|m| m.rows != rows) {
            return Err(BackendError::ShapeMismatch {
                expected: format!("{} rows in every concatenated block", rows),
                actual: format!("{} rows", bad.rows),
            });
        }

        let cols: usize = parts.iter().map(|m| m.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for part in parts {
                data.extend_from_slice(part.row(i));
            }
        }
        Ok(Matrix { data, rows, cols })
    }

    /// Scale every row to unit L2 length; all-zero rows are left untouched
    pub fn normalize_rows(&mut self) {
        for i in 0..self.rows {
            let row = self.row_mut(i);
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                let inv_norm = 1.0 / norm;
                for x in row.iter_mut() {
                    *x *= inv_norm;
                }
            }
        }
    }
}
