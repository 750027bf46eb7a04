use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::engine::{build_engine, EngineOutput, EngineRequest, TransformEngine};
use crate::error::JobError;
use crate::job::{Job, TransformResult};
use crate::preset::Preset;
use crate::workspace::{ArtifactRole, SweepScheduler, WorkspaceGuard, WorkspaceManager};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::progress::{JobPhase, NoopProgress, ProgressEvent, ProgressReporter};
use super::response::{ObfuscateRequest, ObfuscateResponse};

/// Drives one job from submitted source to stamped output.
///
/// Shared across concurrent jobs through `Arc`; the only state jobs have in
/// common is the workspace root, and each job works in its own workspace.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    workspaces: Arc<WorkspaceManager>,
    engine: Arc<dyn TransformEngine>,
}

impl Pipeline {
    /// Production constructor: builds the workspace manager and engine from config.
    pub fn from_config(config: Arc<PipelineConfig>) -> Self {
        let workspaces = Arc::new(WorkspaceManager::new(&config.workspace_root));
        let engine = build_engine(&config.engine, &config.header);
        Self {
            config,
            workspaces,
            engine,
        }
    }

    /// Injects a specific workspace manager and engine.
    pub fn new(
        config: Arc<PipelineConfig>,
        workspaces: Arc<WorkspaceManager>,
        engine: Arc<dyn TransformEngine>,
    ) -> Self {
        Self {
            config,
            workspaces,
            engine,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &Arc<WorkspaceManager> {
        &self.workspaces
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// A sweep scheduler over this pipeline's workspace root.
    pub fn sweep_scheduler(&self) -> SweepScheduler {
        SweepScheduler::new(
            Arc::clone(&self.workspaces),
            self.config.sweep_interval,
            self.config.retention,
        )
    }

    /// Transforms `source` with the named preset (unknown or absent means Medium).
    pub async fn run(&self, source: &str, preset: Option<&str>) -> Result<TransformResult, JobError> {
        self.run_with_progress(source, preset, &NoopProgress).await
    }

    pub async fn run_with_progress(
        &self,
        source: &str,
        preset: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<TransformResult, JobError> {
        let job = Job::new(source, Preset::normalize(preset));
        let (_, outcome) = self.process(PipelineContext::new(job), progress).await;
        outcome
    }

    /// Runs a pending job to completion and returns it in its terminal state.
    pub async fn execute(&self, job: Job, progress: &dyn ProgressReporter) -> Job {
        let (ctx, _) = self.process(PipelineContext::new(job), progress).await;
        ctx.job
    }

    /// Request/response entry point. Never fails; errors become a failure body.
    pub async fn respond(&self, request: ObfuscateRequest) -> ObfuscateResponse {
        self.run(&request.code, request.preset.as_deref())
            .await
            .into()
    }

    async fn process(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (PipelineContext, Result<TransformResult, JobError>) {
        let span = info_span!("pipeline",
            job_id = %ctx.job.id,
            preset = %ctx.job.preset,
            engine = self.engine.name(),
        );

        async move {
            let outcome = match self.transform(&mut ctx, progress).await {
                Ok(result) => ctx.job.succeed(result.clone()).map(|()| result),
                Err(err) => {
                    if let Err(e) = ctx.job.fail(&err) {
                        warn!("Could not record job failure: {}", e);
                    }
                    Err(err)
                }
            };

            match &outcome {
                Ok(result) => {
                    info!(
                        processing_time_ms = result.processing_time_ms,
                        original_size = result.original_size,
                        obfuscated_size = result.obfuscated_size,
                        "Job succeeded"
                    );
                    progress.report(ProgressEvent::Completed {
                        processing_time_ms: result.processing_time_ms,
                        original_size: result.original_size,
                        obfuscated_size: result.obfuscated_size,
                    });
                }
                Err(err) => {
                    warn!(kind = %err.kind(), "Job failed: {}", err);
                    progress.report(ProgressEvent::Failed {
                        error: err.to_string(),
                    });
                }
            }

            (ctx, outcome)
        }
        .instrument(span)
        .await
    }

    async fn transform(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<TransformResult, JobError> {
        // Step 1: Validate input before touching storage
        if ctx.job.source.trim().is_empty() {
            return Err(JobError::EmptyInput);
        }

        // Step 2: Resolve the preset the engine will actually run
        ctx.effective_preset = self.step_resolve_preset(ctx.job.preset);
        ctx.job.start()?;

        // Step 3: Allocate workspace; released when the guard drops
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Allocating,
            message: "Allocating workspace...".to_string(),
        });
        let workspace = {
            let _step = info_span!("allocate_workspace").entered();
            WorkspaceGuard::new(&self.workspaces, self.workspaces.allocate()?)
        };

        // Step 4: Stage input
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Staging,
            message: "Staging input...".to_string(),
        });
        {
            let _step = info_span!("stage_input").entered();
            self.workspaces
                .write(&workspace, ArtifactRole::Input, &ctx.job.source)?;
        }

        // Step 5: Invoke engine under the deadline
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Transforming,
            message: format!("Running {} engine...", self.engine.name()),
        });
        let output = self
            .engine
            .invoke(EngineRequest {
                workspace: workspace.handle(),
                manager: &self.workspaces,
                source: &ctx.job.source,
                preset: ctx.effective_preset,
                deadline: self.config.deadline,
                header: &self.config.header,
            })
            .instrument(info_span!("invoke_engine"))
            .await?;

        // Step 6: Collect and stamp
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Collecting,
            message: "Collecting output...".to_string(),
        });
        let code = {
            let _step = info_span!("collect_output").entered();
            let body = match output {
                EngineOutput::InMemory(text) => text,
                EngineOutput::Artifact => self.workspaces.read(&workspace, ArtifactRole::Output)?,
            };
            self.config.header.stamp(&body)
        };

        // Step 7: Release before reporting success
        drop(workspace);

        Ok(TransformResult {
            processing_time_ms: ctx.elapsed_ms(),
            original_size: ctx.job.source.len(),
            obfuscated_size: code.len(),
            code,
        })
    }

    fn step_resolve_preset(&self, requested: Preset) -> Preset {
        if self.engine.supports(requested) {
            return requested;
        }
        warn!(
            requested = %requested,
            fallback = %Preset::Medium,
            "Preset not supported by engine, falling back"
        );
        Preset::Medium
    }
}
