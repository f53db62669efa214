use thiserror::Error;

/// A raw prediction from a detector backend did not have the expected shape.
///
/// Raised by the normalizer when a required field is missing or carries a
/// non-finite number. It is never recovered from; the whole batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prediction {index}: missing or invalid field '{field}'")]
pub struct DataShapeError {
    /// Position of the offending prediction in the backend response.
    pub index: usize,
    /// Wire name of the field that failed.
    pub field: &'static str,
}

impl DataShapeError {
    pub fn new(index: usize, field: &'static str) -> Self {
        Self { index, field }
    }
}
