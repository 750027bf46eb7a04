//! Isolated execution environment for pipeline tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use monlur::config::schema::Config;
use monlur::{Pipeline, PipelineConfig, TransformEngine, WorkspaceManager};

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Workspace root; not created until the first job allocates.
    pub workspace_root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let workspace_root = temp_dir.path().join("workspaces");
        Self {
            temp_dir,
            workspace_root,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new(&self.workspace_root)
    }

    /// Pipeline with the built-in engine and default settings.
    pub fn builtin_pipeline(&self) -> Pipeline {
        self.pipeline(&self.config().build())
    }

    pub fn pipeline(&self, config: &Config) -> Pipeline {
        Pipeline::from_config(Arc::new(PipelineConfig::from_config(config)))
    }

    pub fn pipeline_with_engine(&self, engine: Arc<dyn TransformEngine>) -> Pipeline {
        let config = Arc::new(PipelineConfig::from_config(&self.config().build()));
        let workspaces = Arc::new(WorkspaceManager::new(&self.workspace_root));
        Pipeline::new(config, workspaces, engine)
    }

    /// Writes a config file into the temp directory.
    pub fn write_config(&self, filename: &str, config: &Config) -> PathBuf {
        let path = self.temp_dir.path().join(filename);
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }

    /// Files currently present under the workspace root.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.workspace_root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn assert_no_artifacts(&self) {
        let left = self.artifacts();
        assert!(left.is_empty(), "Artifacts left behind: {:?}", left);
    }
}
