pub mod config;
pub mod context;
pub mod progress;
pub mod response;
pub mod runner;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use progress::{
    BroadcastProgress, JobPhase, JobProgressEvent, NoopProgress, ProgressEvent, ProgressReporter,
};
pub use response::{ErrorBody, HealthStatus, ObfuscateRequest, ObfuscateResponse};
pub use runner::Pipeline;
