use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::DataSourceConfig;

const DEFAULT_BATCH_SIZE: usize = 8192;

/// Read data from a source and return as RecordBatch iterator
pub fn read_data_source(
    source: &DataSourceConfig,
) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + Send>> {
    match source.source_type.as_str() {
        "parquet" => read_parquet(source),
        _ => anyhow::bail!("Unsupported data source type: {}", source.source_type),
    }
}

/// Expand a source path into the parquet files it names.
///
/// Accepts a single file, a directory (every `*.parquet` inside) or a glob
/// pattern. Matches are returned sorted so partition order is stable.
pub fn resolve_paths(path: &str) -> Result<Vec<PathBuf>> {
    let pattern = if path.contains(['*', '?', '[']) {
        path.to_string()
    } else if Path::new(path).is_dir() {
        Path::new(path)
            .join("*.parquet")
            .to_string_lossy()
            .to_string()
    } else {
        return Ok(vec![PathBuf::from(path)]);
    };

    let mut files = glob::glob(&pattern)
        .with_context(|| format!("Invalid path pattern: {}", pattern))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No parquet files match: {}", path);
    }
    Ok(files)
}

fn read_parquet(
    source: &DataSourceConfig,
) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + Send>> {
    let path = source
        .path
        .as_ref()
        .context("path is required for parquet")?;

    read_parquet_files(&resolve_paths(path)?, source.batch_size, source.limit)
}

/// Read an explicit list of parquet files in the given order.
///
/// An empty list yields no batches.
pub fn read_parquet_files(
    files: &[PathBuf],
    batch_size: Option<usize>,
    limit: Option<usize>,
) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + Send>> {
    let limit = limit.unwrap_or(usize::MAX);
    let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    let mut count = 0;

    let mut batches: Vec<Result<RecordBatch>> = Vec::new();

    'files: for file_path in files {
        if count >= limit {
            break;
        }
        log::debug!("Opening parquet file {}", file_path.display());

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("Failed to read parquet metadata: {}", file_path.display()))?
            .with_batch_size(batch_size)
            .build()?;

        for batch in reader {
            match batch {
                Ok(batch) => {
                    let rows = batch.num_rows();
                    if count + rows > limit {
                        // Truncate last batch if needed
                        let remaining = limit - count;
                        batches.push(Ok(batch.slice(0, remaining)));
                        break 'files;
                    }
                    count += rows;
                    batches.push(Ok(batch));
                }
                Err(e) => batches.push(Err(anyhow::Error::from(e))),
            }
        }
    }

    Ok(Box::new(batches.into_iter()))
}

pub fn write_parquet(batches: Vec<RecordBatch>, path: &Path) -> Result<()> {
    if batches.is_empty() {
        anyhow::bail!("No batches to write");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batches[0].schema(), Some(props))?;

    for batch in batches {
        writer.write(&batch)?;
    }

    writer.close()?;
    Ok(())
}
