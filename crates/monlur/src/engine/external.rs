//! Adapter for an out-of-process transform tool.
//!
//! The tool is invoked either directly
//! (`program args.. --preset <P> <input> --out <output>`) or through a script
//! rendered into the workspace. Exactly one of "process exited" and "deadline
//! elapsed" decides the outcome; on deadline the child is killed and reaped
//! before the error is returned.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::schema::ExternalEngineConfig;
use crate::error::JobError;
use crate::preset::Preset;
use crate::sanitize;
use crate::workspace::ArtifactRole;

use super::{EngineOutput, EngineRequest, TransformEngine};

/// How long to wait for stdout/stderr to drain after the process exited.
const STREAM_DRAIN_GRACE: Duration = Duration::from_secs(2);

pub struct ExternalEngine {
    config: ExternalEngineConfig,
}

impl ExternalEngine {
    pub fn new(config: ExternalEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExternalEngineConfig {
        &self.config
    }

    fn build_command(&self, request: &EngineRequest<'_>) -> Result<TokioCommand, JobError> {
        let workspace = request.workspace;
        let input = workspace.input_path();
        let output = workspace.output_path();

        let mut cmd = TokioCommand::new(&self.config.program);
        cmd.args(&self.config.args);

        match &self.config.script {
            Some(template) => {
                let script = render_script(template, &input, &output, request.preset);
                let script_path = request
                    .manager
                    .write(workspace, ArtifactRole::Script, &script)?;
                cmd.arg(script_path);
            }
            None => {
                cmd.arg(&self.config.preset_flag)
                    .arg(request.preset.as_str())
                    .arg(&input)
                    .arg(&self.config.output_flag)
                    .arg(&output);
            }
        }

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        Ok(cmd)
    }
}

#[async_trait]
impl TransformEngine for ExternalEngine {
    fn name(&self) -> &'static str {
        "external"
    }

    fn supports(&self, preset: Preset) -> bool {
        self.config.supported_presets.contains(&preset)
    }

    async fn invoke(&self, request: EngineRequest<'_>) -> Result<EngineOutput, JobError> {
        let mut cmd = self.build_command(&request)?;

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| JobError::EngineUnavailable {
            program: self.config.program.clone(),
            source: e,
        })?;
        let pid = child.id();
        debug!(program = %self.config.program, pid = ?pid, "Engine process started");

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match tokio::time::timeout(request.deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout.abort();
                stderr.abort();
                return Err(JobError::EngineExecutionFailed {
                    status: "wait failed".to_string(),
                    diagnostics: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    pid = ?pid,
                    deadline_ms = request.deadline.as_millis() as u64,
                    "Engine exceeded deadline, terminating"
                );
                if let Err(e) = child.kill().await {
                    warn!(pid = ?pid, "Failed to terminate engine process: {}", e);
                }
                stdout.abort();
                stderr.abort();
                return Err(JobError::EngineTimeout(request.deadline));
            }
        };

        let stdout = drain(stdout).await;
        let stderr = drain(stderr).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !stdout.is_empty() || !stderr.is_empty() {
            debug!(
                stdout = %String::from_utf8_lossy(&stdout),
                stderr = %String::from_utf8_lossy(&stderr),
                "Engine output"
            );
        }

        check_status(status, &stdout, &stderr)?;

        let output = request.workspace.output_path();
        if !request.manager.exists(request.workspace, ArtifactRole::Output) {
            warn!(
                artifact = %sanitize::redact_path(&output),
                "Engine exited successfully without producing output"
            );
            return Err(JobError::ArtifactMissing(output));
        }

        info!(elapsed_ms, "Engine finished");
        Ok(EngineOutput::Artifact)
    }
}

fn check_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<(), JobError> {
    if status.success() {
        return Ok(());
    }
    Err(JobError::EngineExecutionFailed {
        status: status.to_string(),
        diagnostics: sanitize::diagnostics(stdout, stderr),
    })
}

/// Fills `{input}`, `{output}` and `{preset}` in a script template.
pub fn render_script(template: &str, input: &Path, output: &Path, preset: Preset) -> String {
    template
        .replace("{input}", &input.display().to_string())
        .replace("{output}", &output.display().to_string())
        .replace("{preset}", preset.as_str())
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Collects a reader's bytes; gives up if a leftover grandchild keeps the pipe open.
async fn drain(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    let abort = handle.abort_handle();
    match tokio::time::timeout(STREAM_DRAIN_GRACE, handle).await {
        Ok(Ok(buf)) => buf,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            abort.abort();
            Vec::new()
        }
    }
}
