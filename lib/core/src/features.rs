use crate::backend::BackendError;
use crate::matrix::Matrix;

/// Data flowing between pipeline steps
///
/// Embeddings consume text and produce dense features; transformations
/// consume dense features.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    Text(Vec<String>),
    Dense(Matrix),
}

impl Features {
    /// Wrap a batch of documents
    pub fn text<S: AsRef<str>>(docs: &[S]) -> Self {
        Features::Text(docs.iter().map(|d| d.as_ref().to_string()).collect())
    }

    /// Number of inputs (documents or matrix rows)
    pub fn n_rows(&self) -> usize {
        match self {
            Features::Text(docs) => docs.len(),
            Features::Dense(m) => m.n_rows(),
        }
    }

    /// Feature width, if dense
    pub fn n_cols(&self) -> Option<usize> {
        match self {
            Features::Text(_) => None,
            Features::Dense(m) => Some(m.n_cols()),
        }
    }

    /// Short name of the feature kind, used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Features::Text(_) => "text",
            Features::Dense(_) => "dense",
        }
    }

    pub fn as_text(&self) -> Result<&[String], BackendError> {
        match self {
            Features::Text(docs) => Ok(docs),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_dense(&self) -> Result<&Matrix, BackendError> {
        match self {
            Features::Dense(m) => Ok(m),
            other => Err(other.mismatch("dense")),
        }
    }

    pub fn into_dense(self) -> Result<Matrix, BackendError> {
        match self {
            Features::Dense(m) => Ok(m),
            other => Err(other.mismatch("dense")),
        }
    }

    fn mismatch(&self, expected: &str) -> BackendError {
        BackendError::InvalidInput(format!("expected {} features, got {}", expected, self.kind_name()))
    }
}

impl From<Matrix> for Features {
    fn from(m: Matrix) -> Self {
        Features::Dense(m)
    }
}

impl From<Vec<String>> for Features {
    fn from(docs: Vec<String>) -> Self {
        Features::Text(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_features() {
        let f = Features::text(&["a b", "c"]);
        assert_eq!(f.n_rows(), 2);
        assert_eq!(f.n_cols(), None);
        assert!(f.as_text().is_ok());
        assert_eq!(
            f.as_dense().unwrap_err().to_string(),
            BackendError::InvalidInput("expected dense features, got text".to_string()).to_string()
        );
    }

    #[test]
    fn test_dense_features() {
        let f: Features = Matrix::zeros(4, 3).into();
        assert_eq!(f.n_rows(), 4);
        assert_eq!(f.n_cols(), Some(3));
        assert_eq!(f.kind_name(), "dense");
        assert!(matches!(
            f.as_text(),
            Err(BackendError::InvalidInput(msg)) if msg == "expected text features, got dense"
        ));
        assert_eq!(f.into_dense().unwrap().shape(), (4, 3));
    }
}
