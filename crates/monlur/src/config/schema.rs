use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::preset::Preset;
use crate::provenance::ProvenanceHeader;
use crate::workspace::{DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub header: ProvenanceHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Shared root under which every job's artifacts live.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
    /// Artifacts older than this are reclaimed by the sweep.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl WorkspaceConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("monlur-workspaces")
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Builtin,
    External,
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(EngineKind::Builtin),
            "external" => Ok(EngineKind::External),
            other => Err(format!("unknown engine kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    /// Upper bound on a single engine invocation.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default)]
    pub external: ExternalEngineConfig,
}

impl EngineConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            deadline_secs: default_deadline_secs(),
            external: ExternalEngineConfig::default(),
        }
    }
}

fn default_deadline_secs() -> u64 {
    300
}

/// Invocation contract of the out-of-process engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEngineConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the preset/input/output arguments.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_preset_flag")]
    pub preset_flag: String,
    #[serde(default = "default_output_flag")]
    pub output_flag: String,
    /// Optional script template with `{input}`, `{output}` and `{preset}`
    /// placeholders. When set, the rendered script is written into the
    /// workspace and run as `program args.. <script>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default = "default_supported_presets")]
    pub supported_presets: Vec<Preset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for ExternalEngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            preset_flag: default_preset_flag(),
            output_flag: default_output_flag(),
            script: None,
            supported_presets: default_supported_presets(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

fn default_program() -> String {
    "lua5.1".to_string()
}

fn default_args() -> Vec<String> {
    vec!["./prometheus/cli.lua".to_string()]
}

fn default_preset_flag() -> String {
    "--preset".to_string()
}

fn default_output_flag() -> String {
    "--out".to_string()
}

fn default_supported_presets() -> Vec<Preset> {
    Preset::ALL.to_vec()
}
