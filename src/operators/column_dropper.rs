use anyhow::{Context, Result};
use arrow::array::ArrayRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::TransformError;
use crate::operators::Transformer;

/// Drops a fixed set of named columns from every dataset it is applied to.
///
/// The column list is taken as-is at construction. Names are only checked
/// against a dataset when the transformer is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDropper {
    columns: Vec<String>,
}

impl ColumnDropper {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from YAML operator params.
    ///
    /// `columns` may be a sequence of names or a single name.
    pub fn from_params(params: &HashMap<String, serde_yaml::Value>) -> Result<Self> {
        let value = params
            .get("columns")
            .context("columns parameter is required for drop-columns")?;

        let columns = match value {
            serde_yaml::Value::String(name) => vec![name.clone()],
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .with_context(|| format!("column name must be a string, got {:?}", item))
                })
                .collect::<Result<Vec<_>>>()?,
            other => anyhow::bail!(
                "columns must be a string or a list of strings, got {:?}",
                other
            ),
        };

        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Transformer for ColumnDropper {
    fn fit(
        &mut self,
        _data: &RecordBatch,
        _labels: Option<&ArrayRef>,
    ) -> std::result::Result<&mut Self, TransformError> {
        Ok(self)
    }

    fn transform(
        &self,
        data: &RecordBatch,
        _labels: Option<&ArrayRef>,
    ) -> std::result::Result<RecordBatch, TransformError> {
        drop_columns(data, &self.columns)
    }
}

impl_operator! {
    ColumnDropper,
    name: "drop-columns",
    kind: "transformer"
}

/// Build a new batch without `columns`, keeping the remaining columns in order.
///
/// Fails without output if any name is missing from the batch schema.
pub fn drop_columns(
    batch: &RecordBatch,
    columns: &[String],
) -> std::result::Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let present: HashSet<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

    let mut missing: Vec<String> = Vec::new();
    for name in columns {
        if !present.contains(name.as_str()) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(TransformError::ColumnNotFound {
            missing,
            available: schema.fields().iter().map(|f| f.name().clone()).collect(),
        });
    }

    let dropped: HashSet<&str> = columns.iter().map(String::as_str).collect();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !dropped.contains(f.name().as_str()))
        .map(|(idx, _)| idx)
        .collect();

    let projected = schema.project(&keep)?;
    let arrays: Vec<ArrayRef> = keep.iter().map(|&idx| batch.column(idx).clone()).collect();

    // Row count must be explicit so a batch with every column dropped keeps its length.
    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(projected),
        arrays,
        &options,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Operator;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn people() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int64, true),
            Field::new("country", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["ada", "linus", "grace"])),
                Arc::new(Int64Array::from(vec![36, 54, 85])),
                Arc::new(StringArray::from(vec!["uk", "fi", "us"])),
            ],
        )
        .unwrap()
    }

    fn column_names(batch: &RecordBatch) -> Vec<String> {
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    #[test]
    fn test_drop_two_columns() {
        let data = people();
        let dropper = ColumnDropper::new(["age", "country"]);
        let out = dropper.transform(&data, None).unwrap();

        assert_eq!(column_names(&out), vec!["id", "name"]);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.column(0), data.column(0));
        assert_eq!(out.column(1), data.column(1));
    }

    #[test]
    fn test_missing_column_fails() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("b", DataType::Int64, false),
        ]);
        let data = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![2])),
            ],
        )
        .unwrap();

        let err = ColumnDropper::new(["c"]).transform(&data, None).unwrap_err();
        match err {
            TransformError::ColumnNotFound { missing, available } => {
                assert_eq!(missing, vec!["c"]);
                assert_eq!(available, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_partially_missing_reports_only_absent_names() {
        let err = ColumnDropper::new(["age", "email", "email", "phone"])
            .transform(&people(), None)
            .unwrap_err();
        match err {
            TransformError::ColumnNotFound { missing, .. } => {
                assert_eq!(missing, vec!["email", "phone"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_input_is_unchanged() {
        let data = people();
        let before = data.clone();
        let _ = ColumnDropper::new(["name"]).transform(&data, None).unwrap();

        assert_eq!(data, before);
        assert_eq!(column_names(&data), vec!["id", "name", "age", "country"]);
    }

    #[test]
    fn test_disjoint_drops_compose() {
        let data = people();
        let first = ColumnDropper::new(["age"]).transform(&data, None).unwrap();
        let chained = ColumnDropper::new(["name"]).transform(&first, None).unwrap();
        let single = ColumnDropper::new(["age", "name"])
            .transform(&data, None)
            .unwrap();

        assert_eq!(chained, single);
    }

    #[test]
    fn test_fit_returns_self_unchanged() {
        let mut dropper = ColumnDropper::new(["age"]);
        let expected = dropper.clone();
        let fitted = dropper.fit(&people(), None).unwrap();
        assert_eq!(*fitted, expected);
    }

    #[test]
    fn test_fit_transform_matches_transform() {
        let data = people();
        let mut dropper = ColumnDropper::new(["country"]);
        let a = dropper.fit_transform(&data, None).unwrap();
        let b = dropper.transform(&data, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_are_ignored() {
        let data = people();
        let labels: ArrayRef = Arc::new(Int64Array::from(vec![0, 1, 0]));
        let dropper = ColumnDropper::new(["age"]);

        let with = dropper.transform(&data, Some(&labels)).unwrap();
        let without = dropper.transform(&data, None).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_drop_all_columns_keeps_row_count() {
        let out = ColumnDropper::new(["id", "name", "age", "country"])
            .transform(&people(), None)
            .unwrap();
        assert_eq!(out.num_columns(), 0);
        assert_eq!(out.num_rows(), 3);
    }

    #[test]
    fn test_empty_selector_is_identity() {
        let data = people();
        let out = ColumnDropper::new(Vec::<String>::new())
            .transform(&data, None)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_schema_metadata_is_preserved() {
        let data = people();
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "crm".to_string());
        let schema = data.schema().as_ref().clone().with_metadata(metadata.clone());
        let data = data.with_schema(Arc::new(schema)).unwrap();

        let out = ColumnDropper::new(["age"]).transform(&data, None).unwrap();
        assert_eq!(out.schema().metadata(), &metadata);
    }

    #[test]
    fn test_shared_across_threads() {
        let dropper = ColumnDropper::new(["name"]);
        let data = people();
        let outputs: Vec<RecordBatch> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| dropper.transform(&data, None).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(column_names(&outputs[0]), vec!["id", "age", "country"]);
    }

    #[test]
    fn test_from_params_sequence_and_scalar() {
        let seq: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str("columns: [age, country]").unwrap();
        assert_eq!(
            ColumnDropper::from_params(&seq).unwrap().columns(),
            &["age".to_string(), "country".to_string()]
        );

        let scalar: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str("columns: age").unwrap();
        assert_eq!(
            ColumnDropper::from_params(&scalar).unwrap().columns(),
            &["age".to_string()]
        );
    }

    #[test]
    fn test_from_params_rejects_non_string_names() {
        let params: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str("columns: [age, 3]").unwrap();
        assert!(ColumnDropper::from_params(&params).is_err());

        let params: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str("columns: {age: true}").unwrap();
        assert!(ColumnDropper::from_params(&params).is_err());
    }

    #[test]
    fn test_operator_view_delegates() {
        let mut op: Box<dyn Operator> = Box::new(ColumnDropper::new(["age"]));
        let data = people();
        op.prepare(&data, None).unwrap();
        let out = op.apply(&data, None).unwrap();
        assert_eq!(column_names(&out), vec!["id", "name", "country"]);
    }
}
