use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::EngineConfig;
use crate::config::Config;
use crate::provenance::ProvenanceHeader;

pub struct PipelineConfig {
    pub workspace_root: PathBuf,
    pub deadline: Duration,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub header: ProvenanceHeader,
    pub engine: EngineConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workspace_root: config.workspace.root.clone(),
            deadline: config.engine.deadline(),
            retention: config.workspace.retention(),
            sweep_interval: config.workspace.sweep_interval(),
            header: config.header.clone(),
            engine: config.engine.clone(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
