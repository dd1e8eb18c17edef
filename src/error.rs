use arrow::error::ArrowError;
use thiserror::Error;

/// Errors raised by transformers while preparing or applying.
///
/// Pipelines propagate these unchanged; the runtime attaches batch context
/// with `anyhow` on the way out.
#[derive(Debug, Error)]
pub enum TransformError {
    /// One or more configured columns are absent from the dataset.
    #[error("columns {missing:?} not found in dataset (available: {available:?})")]
    ColumnNotFound {
        missing: Vec<String>,
        available: Vec<String>,
    },
    /// Arrow refused to assemble the output batch.
    #[error("failed to build record batch: {0}")]
    Arrow(#[from] ArrowError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_display_lists_names() {
        let err = TransformError::ColumnNotFound {
            missing: vec!["c".to_string()],
            available: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"c\""));
        assert!(msg.contains("\"a\", \"b\""));
    }

    #[test]
    fn test_arrow_error_converts() {
        let err: TransformError = ArrowError::SchemaError("bad".to_string()).into();
        assert!(matches!(err, TransformError::Arrow(_)));
        assert!(err.to_string().contains("bad"));
    }
}
