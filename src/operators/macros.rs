/// Macro to implement the object-safe `Operator` trait for a `Transformer`
///
/// Usage:
/// ```ignore
/// impl_operator! {
///     ColumnDropper,
///     name: "drop-columns",
///     kind: "transformer"
/// }
/// ```
#[macro_export]
macro_rules! impl_operator {
    (
        $struct_name:ty,
        name: $name:expr,
        kind: $kind:expr
    ) => {
        impl $crate::operators::Operator for $struct_name {
            fn name(&self) -> &str {
                $name
            }

            fn kind(&self) -> &str {
                $kind
            }

            fn prepare(
                &mut self,
                batch: &arrow::record_batch::RecordBatch,
                labels: Option<&arrow::array::ArrayRef>,
            ) -> ::std::result::Result<(), $crate::error::TransformError> {
                $crate::operators::Transformer::fit(self, batch, labels).map(|_| ())
            }

            fn apply(
                &self,
                batch: &arrow::record_batch::RecordBatch,
                labels: Option<&arrow::array::ArrayRef>,
            ) -> ::std::result::Result<
                arrow::record_batch::RecordBatch,
                $crate::error::TransformError,
            > {
                $crate::operators::Transformer::transform(self, batch, labels)
            }
        }
    };
}
