pub mod guard;
pub mod manager;
pub mod sweeper;

pub use guard::WorkspaceGuard;
pub use manager::{ArtifactRole, SweepReport, WorkspaceHandle, WorkspaceManager};
pub use sweeper::{SweepScheduler, DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL};
