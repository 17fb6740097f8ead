use clap::Parser;
use rulemove::output::OutputFormatter;
use rulemove::{Cli, ExecutionMode, FileConfig, Settings, run_cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match FileConfig::load(cli.config.as_deref())
        .and_then(|file| Settings::resolve(file, cli.overrides()))
    {
        Ok(settings) => settings,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(settings.log_level());

    match run_cli(&settings).await {
        Ok(summary) => {
            if summary.mode == ExecutionMode::Live {
                OutputFormatter::success(&format!(
                    "Created {} directories, moved {} files",
                    summary.report.directories_created, summary.report.files_moved
                ));
                if summary.unmatched > 0 {
                    OutputFormatter::warning(&format!(
                        "{} files matched no rule and were left in place",
                        summary.unmatched
                    ));
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
