use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use monlur::config::resolve_config;
use monlur::workspace::WorkspaceManager;
use monlur::{
    Config, EngineKind, HealthStatus, LogFormat, ObfuscateRequest, ObfuscateResponse, Pipeline,
    PipelineConfig,
};

#[derive(Parser)]
#[command(name = "monlur")]
#[command(about = "Protect Lua sources with the Mønlur obfuscation pipeline", version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/monlur/config.json if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Obfuscate a source file ("-" reads stdin)
    Obfuscate {
        input: PathBuf,
        /// Weak, Medium, Strong or Minify; anything else means Medium
        #[arg(short, long)]
        preset: Option<String>,
        /// Overrides the configured engine: builtin or external
        #[arg(short, long)]
        engine: Option<EngineKind>,
        /// Write the protected source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full JSON response
        #[arg(long)]
        json: bool,
    },
    /// Remove workspace artifacts older than the retention window
    Sweep {
        #[arg(long)]
        json: bool,
    },
    /// Print a liveness report
    Health,
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Obfuscate {
            input,
            preset,
            engine,
            output,
            json,
        } => {
            let mut config = load(cli.config.as_deref())?;
            if let Some(kind) = engine {
                config.engine.kind = kind;
            }
            obfuscate_command(&config, &input, preset, output, json).await
        }
        Commands::Sweep { json } => {
            let config = load(cli.config.as_deref())?;
            sweep_command(&config, json)
        }
        Commands::Health => health_command(),
    }
}

fn load(path: Option<&Path>) -> Result<Config> {
    resolve_config(path).context("Failed to load configuration")
}

fn read_source(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read source file '{}'", input.display()))
}

pub async fn obfuscate_command(
    config: &Config,
    input: &Path,
    preset: Option<String>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let source = read_source(input)?;
    let pipeline = Pipeline::from_config(Arc::new(PipelineConfig::from_config(config)));
    info!(engine = pipeline.engine_name(), "Obfuscating");

    let response = pipeline
        .respond(ObfuscateRequest {
            code: source,
            preset,
        })
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(exit_code(&response));
    }

    match (&response.result, &response.error) {
        (Some(result), _) => {
            match output {
                Some(path) => std::fs::write(&path, &result.code)
                    .with_context(|| format!("Failed to write '{}'", path.display()))?,
                None => print!("{}", result.code),
            }
            eprintln!(
                "Protected {} -> {} bytes in {} ms",
                result.original_size, result.obfuscated_size, result.processing_time_ms
            );
        }
        (None, Some(error)) => eprintln!("error [{}]: {}", error.kind, error.message),
        (None, None) => eprintln!("error: empty response"),
    }
    Ok(exit_code(&response))
}

fn exit_code(response: &ObfuscateResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn sweep_command(config: &Config, json: bool) -> Result<ExitCode> {
    let manager = WorkspaceManager::new(&config.workspace.root);
    let report = manager.sweep(config.workspace.retention());

    if json {
        println!(
            "{}",
            serde_json::json!({
                "scanned": report.scanned,
                "removed": report.removed,
                "failed": report.failed,
            })
        );
    } else {
        println!(
            "Swept {}: {} scanned, {} removed, {} failed",
            manager.root().display(),
            report.scanned,
            report.removed,
            report.failed
        );
    }

    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn health_command() -> Result<ExitCode> {
    println!("{}", serde_json::to_string(&HealthStatus::ok())?);
    Ok(ExitCode::SUCCESS)
}
