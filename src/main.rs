//! debug-inspector - replay a recorded debugging session through the
//! variables tree

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use debug_inspector::config::InspectorConfig;
use debug_inspector::driver::{self, DriverError, Inspector};
use debug_inspector::session::Transcript;

/// Watches and locals of a debugging session, kept in step with the debugger
#[derive(Parser)]
#[command(name = "debug-inspector")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// TOML file overriding column headers, labels and page size
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append the log to this file as well
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a transcript and print the tree after every stop
    Replay {
        /// JSON transcript of the session
        transcript: PathBuf,
        /// Print only the tree after the last stop
        #[arg(long)]
        last: bool,
        #[command(flatten)]
        common: Common,
    },
    /// Step through a transcript interactively
    Console {
        /// JSON transcript of the session (an empty session if omitted)
        #[arg(long)]
        transcript: Option<PathBuf>,
        #[command(flatten)]
        common: Common,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let common = match &cli.command {
        Commands::Replay { common, .. } | Commands::Console { common, .. } => common,
    };
    let _guard = init_logging(common.verbose, common.log_file.as_deref());
    info!("=== debug-inspector started ===");

    let result = match &cli.command {
        Commands::Replay {
            transcript,
            last,
            common,
        } => run_replay(transcript, common.config.as_deref(), *last),
        Commands::Console { transcript, common } => {
            run_console(transcript.as_deref(), common.config.as_deref())
        }
    };

    match result {
        Ok(()) => {
            info!("=== debug-inspector exiting ===");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .init();
        return None;
    };

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "debug-inspector.log".into());
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    tracing_subscriber::fmt()
        .with_max_level(level.max(LevelFilter::INFO))
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Some(guard)
}

fn run_replay(transcript: &Path, config: Option<&Path>, last: bool) -> Result<(), DriverError> {
    let mut inspector = Inspector::load(transcript, config)?;
    let frames = driver::replay(&mut inspector)?;
    if last {
        if let Some(frame) = frames.last() {
            print!("{}", frame);
        }
        return Ok(());
    }
    for (stop, frame) in frames.iter().enumerate() {
        println!("--- stop {} ---", stop + 1);
        print!("{}", frame);
    }
    Ok(())
}

fn run_console(transcript: Option<&Path>, config: Option<&Path>) -> Result<(), DriverError> {
    let mut inspector = match transcript {
        Some(path) => Inspector::load(path, config)?,
        None => {
            let config = match config {
                Some(path) => InspectorConfig::load(path)?,
                None => InspectorConfig::default(),
            };
            Inspector::new(config, Transcript::default())
        }
    };
    let stdin = io::stdin();
    driver::run_console(&mut inspector, stdin.lock(), io::stdout())
}
