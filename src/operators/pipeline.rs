use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::operators::{Operator, Transformer};

/// Row and column shape of one step's input and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrace {
    pub input_rows: usize,
    pub output_rows: usize,
    pub input_columns: Vec<String>,
    pub output_columns: Vec<String>,
}

impl StepTrace {
    fn between(input: &RecordBatch, output: &RecordBatch) -> Self {
        Self {
            input_rows: input.num_rows(),
            output_rows: output.num_rows(),
            input_columns: column_names(input),
            output_columns: column_names(output),
        }
    }

    /// Columns present on the way in but not on the way out.
    pub fn dropped_columns(&self) -> Vec<String> {
        self.input_columns
            .iter()
            .filter(|c| !self.output_columns.contains(c))
            .cloned()
            .collect()
    }
}

fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Ordered chain of named operators sharing the fit/transform contract.
///
/// Fitting prepares each step on the output of the steps before it, so a
/// step always sees the same shape of data at fit time as at transform time.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Operator>)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, name: impl Into<String>, operator: Box<dyn Operator>) -> Self {
        self.push(name, operator);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, operator: Box<dyn Operator>) {
        self.steps.push((name.into(), operator));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &dyn Operator)> {
        self.steps.iter().map(|(name, op)| (name.as_str(), op.as_ref()))
    }

    /// Apply every step and record the shape before and after each one.
    pub fn transform_traced(
        &self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> Result<(RecordBatch, Vec<StepTrace>), TransformError> {
        let mut current = data.clone();
        let mut traces = Vec::with_capacity(self.steps.len());
        for (_, step) in &self.steps {
            let next = step.apply(&current, labels)?;
            traces.push(StepTrace::between(&current, &next));
            current = next;
        }
        Ok((current, traces))
    }
}

impl Transformer for Pipeline {
    fn fit(
        &mut self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> Result<&mut Self, TransformError> {
        let mut current = data.clone();
        let last = self.steps.len().saturating_sub(1);
        for (idx, (name, step)) in self.steps.iter_mut().enumerate() {
            log::debug!("Preparing step '{}' ({})", name, step.name());
            step.prepare(&current, labels)?;
            if idx < last {
                current = step.apply(&current, labels)?;
            }
        }
        Ok(self)
    }

    fn transform(
        &self,
        data: &RecordBatch,
        labels: Option<&ArrayRef>,
    ) -> Result<RecordBatch, TransformError> {
        let mut current = data.clone();
        for (_, step) in &self.steps {
            current = step.apply(&current, labels)?;
        }
        Ok(current)
    }
}
