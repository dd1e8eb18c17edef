//! Column-dropping transformer with a two-phase `fit`/`transform` contract.
//!
//! [`ColumnDropper`] removes a fixed set of named columns from an Arrow
//! [`RecordBatch`](arrow::record_batch::RecordBatch), returning a new batch and
//! leaving the input untouched. It composes with other operators through
//! [`Pipeline`], and the [`runtime`] module drives pipelines declared in YAML
//! over Parquet files.
//!
//! ```ignore
//! use column_dropper::{ColumnDropper, Transformer};
//!
//! let mut dropper = ColumnDropper::new(["age", "country"]);
//! let trimmed = dropper.fit(&batch, None)?.transform(&batch, None)?;
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod operators;
pub mod runtime;

pub use error::TransformError;
pub use operators::{ColumnDropper, Operator, Pipeline, StepTrace, Transformer};
