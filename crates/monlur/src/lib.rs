pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod preset;
pub mod provenance;
pub mod sanitize;
pub mod workspace;

pub use config::{load_config, resolve_config, Config, EngineKind};
pub use engine::{
    build_engine, BuiltinEngine, EngineOutput, EngineRequest, ExternalEngine, TransformEngine,
};
pub use error::{ConfigError, ErrorKind, JobError, MonlurError, Result};
pub use job::{Job, JobFailure, JobStatus, TransformResult};
pub use logging::{init_tracing, LogFormat};
pub use pipeline::{
    HealthStatus, ObfuscateRequest, ObfuscateResponse, Pipeline, PipelineConfig, PipelineContext,
};
pub use preset::Preset;
pub use provenance::ProvenanceHeader;
pub use workspace::{SweepScheduler, WorkspaceGuard, WorkspaceHandle, WorkspaceManager};
