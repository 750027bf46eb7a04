mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = monlur::init_tracing(cli.log_format) {
        eprintln!("warning: {}", e);
    }

    cli::run(cli).await
}
