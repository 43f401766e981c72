use thiserror::Error;

/// Failures reported by the linear algebra kernel and the filters built on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Gauss-Jordan elimination found no pivot above epsilon in `column`.
    #[error("matrix is singular: no usable pivot in column {column}")]
    SingularMatrix { column: usize },

    #[error("dimension mismatch for {what}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
}

impl FilterError {
    pub(crate) fn dimension_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        FilterError::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}
