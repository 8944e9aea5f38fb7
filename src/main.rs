use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

use execmon::{CapturedCommand, PatternEntry, PatternRegistry, Supervisor};

/// Run a command and capture a classified, timestamped transcript.
#[derive(Parser)]
#[command(name = "execmon")]
#[command(about = "Captured subprocess execution monitor", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Working directory for the child process
    #[arg(short = 'C', long)]
    cwd: Option<PathBuf>,

    /// Environment overrides, KEY=VALUE (repeatable; override wins)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// JSON file with pattern registry entries
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Write the transcript to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print final pattern counts as JSON to stdout
    #[arg(long)]
    counts_json: bool,

    /// Command to execute; a single argument is split like a shell would
    #[arg(trailing_var_arg = true, required = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();

    match run(cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut builder = if cli.command.len() == 1 {
        CapturedCommand::parse(&cli.command[0])?
    } else {
        let (program, args) = cli
            .command
            .split_first()
            .context("Empty command line")?;
        execmon::CapturedCommandBuilder::new(program).args(args)
    };

    if let Some(dir) = &cli.cwd {
        builder = builder.current_dir(dir);
    }
    for pair in &cli.env {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid environment override '{pair}', expected KEY=VALUE"))?;
        builder = builder.env(key, value);
    }
    let command = builder.build();

    let mut registry = load_registry(cli.patterns.as_deref())?;
    debug!("Running '{}'", command.display());

    let result = Supervisor::new().execute(&command, &mut registry).await?;

    if let Some(path) = &cli.log_file {
        std::fs::write(path, &result.transcript)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    } else {
        print!("{}", result.transcript);
    }

    registry.log_summary();
    if cli.counts_json {
        let entries: Vec<&PatternEntry> = registry.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    Ok(result.exit_code)
}

fn load_registry(path: Option<&std::path::Path>) -> Result<PatternRegistry> {
    let Some(path) = path else {
        return Ok(PatternRegistry::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pattern file {}", path.display()))?;
    let entries: Vec<PatternEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid pattern file {}", path.display()))?;
    Ok(PatternRegistry::from_entries(entries))
}
