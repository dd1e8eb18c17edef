use anyhow::Result;
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;

use crate::error::TransformError;

#[macro_use]
pub mod macros;
pub mod column_dropper;
pub mod pipeline;

pub use column_dropper::ColumnDropper;
pub use pipeline::{Pipeline, StepTrace};

/// Two-phase transformer contract: prepare on a dataset, then apply it.
///
/// `labels` is the optional target column of a supervised pipeline. It is
/// threaded through both phases so transformers compose with estimators.
pub trait Transformer: Send + Sync {
    /// Prepare the transformer from `data` and return it.
    fn fit(
        &mut self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> std::result::Result<&mut Self, TransformError>;

    /// Produce a new dataset from `data`. The input is never modified.
    fn transform(
        &self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> std::result::Result<RecordBatch, TransformError>;

    fn fit_transform(
        &mut self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> std::result::Result<RecordBatch, TransformError> {
        self.fit(data, labels)?.transform(data, labels)
    }
}

/// Object-safe view of a transformer, used to store heterogeneous pipeline steps.
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> &str;
    fn prepare(
        &mut self,
        batch: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> std::result::Result<(), TransformError>;
    fn apply(
        &self,
        batch: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> std::result::Result<RecordBatch, TransformError>;
}

pub fn create_operator(
    name: &str,
    params: HashMap<String, serde_yaml::Value>,
) -> Result<Box<dyn Operator>> {
    match name {
        "drop-columns" => Ok(Box::new(ColumnDropper::from_params(&params)?)),
        _ => anyhow::bail!("Unknown operator: {}", name),
    }
}
