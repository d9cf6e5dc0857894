use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use owid_tests_collector::app::{Collector, RunOptions};
use owid_tests_collector::config::ConfigLoader;
use owid_tests_collector::error::CollectorError;
use owid_tests_collector::output::{JsonOutput, OutputMode, TextOutput};
use owid_tests_collector::source::HttpSourceClient;

#[derive(Parser)]
#[command(name = "collect-tests-owid")]
#[command(about = "Derive per-country positive PCR tests per 100k from OWID testing data")]
#[command(version)]
struct Cli {
    /// Directory that relative paths are resolved against.
    #[arg(long)]
    base_dir: Option<Utf8PathBuf>,

    /// JSON file overriding input, reference and output paths.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Download the source CSV even if a local copy exists.
    #[arg(long)]
    refresh: bool,

    /// Print the run summary as JSON instead of progress lines.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CollectorError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CollectorError) -> u8 {
    match error {
        CollectorError::MissingReference(_)
        | CollectorError::MissingManifest(_)
        | CollectorError::MissingConfig(_) => 2,
        CollectorError::SourceHttp(_) | CollectorError::SourceStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            Utf8PathBuf::from_path_buf(cwd)
                .map_err(|path| CollectorError::InvalidPath(path.display().to_string()))?
        }
    };
    let config = ConfigLoader::resolve(&base_dir, cli.config.as_deref())?;
    debug!(?config, "resolved config");

    let collector = Collector::new(config, HttpSourceClient::new()?);
    let options = RunOptions {
        refresh: cli.refresh,
    };

    match output_mode {
        OutputMode::Text => {
            let summary = collector.run(&options, &TextOutput)?;
            TextOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Json => {
            let summary = collector.run(&options, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
    }
    Ok(())
}
