//! Builders for test configurations.

#![allow(dead_code)]

use std::path::Path;

use monlur::config::schema::{Config, EngineKind, ExternalEngineConfig};
use monlur::Preset;

/// Builder for `Config` instances rooted in a test directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(workspace_root: &Path) -> Self {
        let mut config = Config::default();
        config.workspace.root = workspace_root.to_path_buf();
        config.engine.deadline_secs = 10;
        Self { config }
    }

    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.config.engine.deadline_secs = secs;
        self
    }

    pub fn retention_secs(mut self, secs: u64) -> Self {
        self.config.workspace.retention_secs = secs;
        self
    }

    pub fn header(mut self, tool_name: &str, version: &str) -> Self {
        self.config.header.tool_name = tool_name.to_string();
        self.config.header.version = version.to_string();
        self
    }

    /// Uses `sh` running the given script template as the external engine.
    pub fn shell_engine(mut self, script: &str) -> Self {
        self.config.engine.kind = EngineKind::External;
        self.config.engine.external = ExternalEngineConfig {
            program: "sh".to_string(),
            args: vec![],
            script: Some(script.to_string()),
            ..ExternalEngineConfig::default()
        };
        self
    }

    pub fn supported_presets(mut self, presets: &[Preset]) -> Self {
        self.config.engine.external.supported_presets = presets.to_vec();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
