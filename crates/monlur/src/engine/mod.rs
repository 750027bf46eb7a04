pub mod builtin;
pub mod external;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::schema::{EngineConfig, EngineKind};
use crate::error::JobError;
use crate::preset::Preset;
use crate::provenance::ProvenanceHeader;
use crate::workspace::{WorkspaceHandle, WorkspaceManager};

pub use builtin::BuiltinEngine;
pub use external::ExternalEngine;

/// Everything an engine gets for one invocation. The input artifact has
/// already been staged in `workspace` when this is handed over.
pub struct EngineRequest<'a> {
    pub workspace: &'a WorkspaceHandle,
    pub manager: &'a WorkspaceManager,
    pub source: &'a str,
    pub preset: Preset,
    pub deadline: Duration,
    /// Header the job's output is stamped with. Engines that stamp their own
    /// output must use this one.
    pub header: &'a ProvenanceHeader,
}

/// Where a successful engine left its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    InMemory(String),
    /// Written to the workspace's output artifact.
    Artifact,
}

#[async_trait]
pub trait TransformEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, _preset: Preset) -> bool {
        true
    }

    async fn invoke(&self, request: EngineRequest<'_>) -> Result<EngineOutput, JobError>;
}

/// Builds the engine selected by configuration.
pub fn build_engine(config: &EngineConfig, header: &ProvenanceHeader) -> Arc<dyn TransformEngine> {
    match config.kind {
        EngineKind::Builtin => Arc::new(BuiltinEngine::new(header.clone())),
        EngineKind::External => Arc::new(ExternalEngine::new(config.external.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_engine_routes_kind() {
        let header = ProvenanceHeader::default();

        let config = EngineConfig::default();
        assert_eq!(build_engine(&config, &header).name(), "builtin");

        let config = EngineConfig {
            kind: EngineKind::External,
            ..EngineConfig::default()
        };
        assert_eq!(build_engine(&config, &header).name(), "external");
    }
}
