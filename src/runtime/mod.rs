use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::{PipelineConfig, StageConfig};
use crate::io;
use crate::operators::{self, Pipeline, StepTrace, Transformer};

mod manifest;
pub use manifest::{Manifest, OperatorManifest, StageManifest};

type ProcessedBatchResult = Result<(RecordBatch, usize, Vec<StepTrace>)>;

/// Files a finished stage wrote, read back verbatim by the next stage.
struct StageOutput {
    path: String,
    partition_files: Vec<PathBuf>,
}

/// Build the operator chain declared by a stage.
pub fn build_pipeline(stage: &StageConfig) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    for op_config in &stage.operators {
        let op_name = op_config.get_operator_name();
        let params = op_config.get_params();
        let operator = operators::create_operator(&op_name, params).with_context(|| {
            format!(
                "Failed to create operator '{}' in stage '{}'",
                op_name, stage.name
            )
        })?;
        pipeline.push(op_name, operator);
    }
    Ok(pipeline)
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<Manifest> {
    log::info!("Running pipeline: {}", config.name);

    let mut manifest = Manifest::new(config.name.clone());
    let mut previous_output: Option<StageOutput> = None;

    for (stage_idx, stage) in config.stages.iter().enumerate() {
        log::info!(
            "[Stage {}/{}] {}",
            stage_idx + 1,
            config.stages.len(),
            stage.name
        );

        // Determine input: own source, or exactly what the previous stage wrote
        let (input_path, batches_iter) = match (&stage.input, &previous_output) {
            (Some(input), _) => (
                input.source.path.clone(),
                io::read_data_source(&input.source),
            ),
            (None, Some(prev)) => (
                Some(prev.path.clone()),
                io::read_parquet_files(&prev.partition_files, None, None),
            ),
            (None, None) => anyhow::bail!(
                "Stage '{}' has no input and no previous stage output",
                stage.name
            ),
        };

        log::info!("  Reading input from: {:?}", input_path);
        let batches: Vec<RecordBatch> = batches_iter
            .with_context(|| format!("Failed to open input of stage '{}'", stage.name))?
            .collect::<Result<Vec<_>>>()?;
        log::info!("  Read {} batches", batches.len());

        let mut pipeline = build_pipeline(stage)?;

        // Prepare phase
        if let Some(first) = batches.first() {
            pipeline
                .fit(first, None)
                .with_context(|| format!("Failed to prepare stage '{}'", stage.name))?;
        }

        let output_dir = Path::new(
            stage
                .output
                .source
                .path
                .as_ref()
                .context("Output path is required")?,
        );
        std::fs::create_dir_all(output_dir)?;
        clear_partitions(output_dir)?;

        log::info!("  Applying {} operators...", pipeline.len());
        let pb = ProgressBar::new(batches.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%)",
                )?,
        );

        // Each batch is independent; collect keeps input order
        let processed: Vec<ProcessedBatchResult> = batches
            .into_par_iter()
            .enumerate()
            .map(|(batch_idx, batch)| -> ProcessedBatchResult {
                let input_rows = batch.num_rows();
                let (output, traces) = pipeline
                    .transform_traced(&batch, None)
                    .with_context(|| format!("Failed to process batch {}", batch_idx))?;
                pb.inc(1);
                Ok((output, input_rows, traces))
            })
            .collect();

        // Collect results and aggregate statistics
        let mut output_batches = Vec::with_capacity(processed.len());
        let mut total_input_rows = 0;
        let mut total_output_rows = 0;
        let mut operator_manifests: Vec<OperatorManifest> = pipeline
            .steps()
            .map(|(name, op)| OperatorManifest {
                name: name.to_string(),
                kind: op.kind().to_string(),
                input_rows: 0,
                output_rows: 0,
                input_columns: Vec::new(),
                output_columns: Vec::new(),
                dropped_columns: Vec::new(),
            })
            .collect();

        for (batch_idx, result) in processed.into_iter().enumerate() {
            let (batch, input_rows, traces) =
                result.with_context(|| format!("Stage '{}' failed", stage.name))?;
            total_input_rows += input_rows;
            total_output_rows += batch.num_rows();

            // Column lists are the same for every batch; take them from the first
            for (op_manifest, trace) in operator_manifests.iter_mut().zip(&traces) {
                op_manifest.input_rows += trace.input_rows;
                op_manifest.output_rows += trace.output_rows;
                if batch_idx == 0 {
                    op_manifest.dropped_columns = trace.dropped_columns();
                    op_manifest.input_columns = trace.input_columns.clone();
                    op_manifest.output_columns = trace.output_columns.clone();
                }
            }

            output_batches.push(batch);
        }

        pb.finish_with_message("All batches processed");

        // Write partitions (sequential to maintain order)
        let partition_files =
            write_partitions(output_batches, output_dir, stage.output.source.partition_size())?;
        if partition_files.is_empty() {
            log::warn!("  Stage '{}' produced no rows; nothing written", stage.name);
        }

        for op in &operator_manifests {
            log::info!(
                "    {} ({}): {} -> {} columns, dropped {:?}",
                op.name,
                op.kind,
                op.input_columns.len(),
                op.output_columns.len(),
                op.dropped_columns
            );
        }
        log::info!("  Wrote {} partition files", partition_files.len());
        log::info!(
            "  Stage completed: {} rows written (from {} input rows)",
            total_output_rows,
            total_input_rows
        );

        manifest.add_stage(StageManifest {
            name: stage.name.clone(),
            input_path,
            output_path: output_dir.to_string_lossy().to_string(),
            partition_files: partition_files.clone(),
            operators: operator_manifests,
            total_input_rows,
            total_output_rows,
        });

        let manifest_path = output_dir.join("manifest.json");
        manifest.write_to_file(&manifest_path)?;
        log::info!("  Manifest written to: {}", manifest_path.display());

        previous_output = Some(StageOutput {
            path: output_dir.to_string_lossy().to_string(),
            partition_files: partition_files.into_iter().map(PathBuf::from).collect(),
        });
    }

    log::info!("Pipeline completed successfully");
    Ok(manifest)
}

/// Remove `part-*.parquet` files left in `dir` by an earlier run.
fn clear_partitions(dir: &Path) -> Result<()> {
    let pattern = dir.join("part-*.parquet");
    for stale in glob::glob(&pattern.to_string_lossy())? {
        let stale = stale?;
        log::debug!("Removing stale partition {}", stale.display());
        std::fs::remove_file(&stale)
            .with_context(|| format!("Failed to remove {}", stale.display()))?;
    }
    Ok(())
}

/// Write batches as `part-NNNNN.parquet` files of at most `partition_size` rows, in order.
fn write_partitions(
    batches: Vec<RecordBatch>,
    dir: &Path,
    partition_size: usize,
) -> Result<Vec<String>> {
    let partition_size = partition_size.max(1);
    let mut files = Vec::new();
    let mut pending: Vec<RecordBatch> = Vec::new();
    let mut pending_rows = 0;

    for batch in batches {
        let mut remaining = batch;
        while remaining.num_rows() > 0 {
            let room = partition_size - pending_rows;
            if remaining.num_rows() < room {
                pending_rows += remaining.num_rows();
                pending.push(remaining);
                break;
            }
            pending.push(remaining.slice(0, room));
            flush_partition(&mut pending, dir, &mut files)?;
            pending_rows = 0;
            remaining = remaining.slice(room, remaining.num_rows() - room);
        }
    }

    if !pending.is_empty() {
        flush_partition(&mut pending, dir, &mut files)?;
    }

    Ok(files)
}

fn flush_partition(
    pending: &mut Vec<RecordBatch>,
    dir: &Path,
    files: &mut Vec<String>,
) -> Result<()> {
    let partition_file = dir.join(format!("part-{:05}.parquet", files.len()));
    io::write_parquet(std::mem::take(pending), &partition_file)
        .with_context(|| format!("Failed to write {}", partition_file.display()))?;
    files.push(partition_file.to_string_lossy().to_string());
    Ok(())
}
