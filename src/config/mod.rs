use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_PARTITION_SIZE: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub source: DataSourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub source: DataSourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(rename = "type")]
    pub source_type: String,
    pub path: Option<String>,
    /// Maximum number of rows to read.
    pub limit: Option<usize>,
    /// Rows per batch when reading.
    pub batch_size: Option<usize>,
    /// Rows per partition file when writing.
    pub partition_size: Option<usize>,
}

impl DataSourceConfig {
    pub fn partition_size(&self) -> usize {
        self.partition_size.unwrap_or(DEFAULT_PARTITION_SIZE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperatorConfig {
    Simple(String),
    WithParams {
        #[serde(flatten)]
        params: HashMap<String, serde_yaml::Value>,
    },
}

impl PipelineConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        // Validate
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // Check stage names are unique and every stage writes somewhere
        let mut stage_names = std::collections::HashSet::new();
        for stage in &self.stages {
            if !stage_names.insert(&stage.name) {
                anyhow::bail!("Duplicate stage name: {}", stage.name);
            }
            if stage.output.source.path.is_none() {
                anyhow::bail!("Stage '{}' must have an output path", stage.name);
            }
            if stage.output.source.partition_size == Some(0) {
                anyhow::bail!("Stage '{}' has partition_size 0", stage.name);
            }
        }

        // Check first stage has input
        if let Some(first_stage) = self.stages.first() {
            if first_stage.input.is_none() {
                anyhow::bail!(
                    "First stage '{}' must have input configuration",
                    first_stage.name
                );
            }
        }

        Ok(())
    }
}

impl OperatorConfig {
    pub fn get_operator_name(&self) -> String {
        match self {
            OperatorConfig::Simple(name) => name.clone(),
            OperatorConfig::WithParams { params } => {
                // The operator name is the one key that is not a reserved field
                for key in params.keys() {
                    if !matches!(key.as_str(), "id" | "kind" | "op" | "params") {
                        return key.clone();
                    }
                }
                params
                    .get("op")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            }
        }
    }

    pub fn get_params(&self) -> HashMap<String, serde_yaml::Value> {
        match self {
            OperatorConfig::Simple(_) => HashMap::new(),
            OperatorConfig::WithParams { params } => {
                // Params live under the operator-name key or under `params`
                let mut result = HashMap::new();
                for (key, value) in params {
                    let nested = match key.as_str() {
                        "id" | "kind" | "op" => continue,
                        _ => value.as_mapping(),
                    };
                    if let Some(nested) = nested {
                        for (k, v) in nested {
                            if let Some(k_str) = k.as_str() {
                                result.insert(k_str.to_string(), v.clone());
                            }
                        }
                    }
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: strip-pii
stages:
  - name: drop-pii
    input:
      source:
        type: parquet
        path: data/*.parquet
        batch_size: 512
    operators:
      - drop-columns:
          columns: [name, email]
    output:
      source:
        type: parquet
        path: out/drop-pii
        partition_size: 2000
  - name: drop-age
    operators:
      - op: drop-columns
        params:
          columns: age
    output:
      source:
        type: parquet
        path: out/drop-age
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = PipelineConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.name, "strip-pii");
        assert_eq!(config.stages.len(), 2);

        let first = &config.stages[0];
        let input = &first.input.as_ref().unwrap().source;
        assert_eq!(input.source_type, "parquet");
        assert_eq!(input.batch_size, Some(512));
        assert_eq!(first.output.source.partition_size(), 2000);
        assert_eq!(
            config.stages[1].output.source.partition_size(),
            DEFAULT_PARTITION_SIZE
        );
    }

    #[test]
    fn test_operator_name_and_params_nested_form() {
        let config = PipelineConfig::from_yaml_str(SAMPLE).unwrap();
        let op = &config.stages[0].operators[0];
        assert_eq!(op.get_operator_name(), "drop-columns");
        let params = op.get_params();
        let columns = params.get("columns").unwrap().as_sequence().unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_operator_name_and_params_op_form() {
        let config = PipelineConfig::from_yaml_str(SAMPLE).unwrap();
        let op = &config.stages[1].operators[0];
        assert_eq!(op.get_operator_name(), "drop-columns");
        assert_eq!(
            op.get_params().get("columns").and_then(|v| v.as_str()),
            Some("age")
        );
    }

    #[test]
    fn test_simple_operator_form() {
        let op: OperatorConfig = serde_yaml::from_str("drop-columns").unwrap();
        assert_eq!(op.get_operator_name(), "drop-columns");
        assert!(op.get_params().is_empty());
    }

    #[test]
    fn test_duplicate_stage_names_rejected() {
        let yaml = r#"
name: dup
stages:
  - name: s
    input: { source: { type: parquet, path: a.parquet } }
    output: { source: { type: parquet, path: out/a } }
  - name: s
    output: { source: { type: parquet, path: out/b } }
"#;
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate stage name: s"));
    }

    #[test]
    fn test_first_stage_requires_input() {
        let yaml = r#"
name: no-input
stages:
  - name: s
    output: { source: { type: parquet, path: out/a } }
"#;
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("must have input configuration"));
    }

    #[test]
    fn test_output_path_required() {
        let yaml = r#"
name: no-output
stages:
  - name: s
    input: { source: { type: parquet, path: a.parquet } }
    output: { source: { type: parquet } }
"#;
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("must have an output path"));
    }
}
