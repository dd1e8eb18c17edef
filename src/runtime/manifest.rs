use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub pipeline_name: String,
    pub stages: Vec<StageManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageManifest {
    pub name: String,
    pub input_path: Option<String>,
    pub output_path: String,
    /// Partition files in write order; the next stage reads exactly these.
    pub partition_files: Vec<String>,
    pub operators: Vec<OperatorManifest>,
    pub total_input_rows: usize,
    pub total_output_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorManifest {
    pub name: String,
    pub kind: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub input_columns: Vec<String>,
    pub output_columns: Vec<String>,
    // For column-dropping operators
    pub dropped_columns: Vec<String>,
}

impl Manifest {
    pub fn new(pipeline_name: String) -> Self {
        Self {
            pipeline_name,
            stages: Vec::new(),
        }
    }

    pub fn add_stage(&mut self, stage: StageManifest) {
        self.stages.push(stage);
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}
