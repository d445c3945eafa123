use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

mod shell;
mod utils;

use shell::inventory::Fixture;
use shell::sink::StyleOptions;
use shell::{Shell, ShellOptions, Summary};

/// cmdlang - command-language console over a management inventory
///
/// Runs command lines against a tree of domain / entity / sensor / control /
/// MC / connection commands. Lines come from, in order of preference:
///   -e LINE (repeatable)   run each given line
///   SCRIPT                 run a file, one command per line
///   stdin                  interactive console (`> ` prompt on a terminal)
///
/// Global flags / env:
///   -v / -vv              Increase log verbosity (stderr); RUST_LOG overrides
///   -q / --quiet          Errors only
///   -i / --inventory      Inventory fixture, YAML or JSON (or CMDLANG_INVENTORY env)
///   --json                One JSON document per line instead of indented text
///   NO_COLOR              Disable colored names
///
/// Examples:
///   cmdlang -i lab.yaml -e "domain list"
///   cmdlang -i lab.yaml -e "sensor get lab(7.1).Temp" --json
///   cmdlang -i lab.yaml -e "help sensor"
///   cmdlang -i lab.yaml checks.txt
///
/// Exit status is 1 when any non-interactive line failed.
#[derive(Parser, Debug)]
#[command(
    name = "cmdlang",
    version,
    author,
    about = "cmdlang - command-language console over a management inventory",
    propagate_version = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all non-error logging
    #[arg(short, long)]
    quiet: bool,

    /// Inventory fixture file (YAML or JSON)
    #[arg(short = 'i', long = "inventory", value_name = "FILE")]
    inventory: Option<PathBuf>,

    /// Emit one JSON document per line
    #[arg(long)]
    json: bool,

    /// Command line to run (repeatable, in order)
    #[arg(short = 'e', long = "exec", value_name = "LINE")]
    exec: Vec<String>,

    /// Seconds to wait for a line to complete
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Simulated latency of `domain refresh`, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 50)]
    refresh_delay_ms: u64,

    /// Script file, one command per line
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    // Inventory (CLI flag > CMDLANG_INVENTORY env > empty)
    let inventory = match cli
        .inventory
        .clone()
        .or_else(|| utils::env_path("CMDLANG_INVENTORY"))
    {
        Some(path) => {
            let fx = Fixture::load(&path)?;
            tracing::debug!(path = %path.display(), domains = fx.domains.len(), "inventory loaded");
            fx
        }
        None => {
            tracing::info!("no inventory given; starting with an empty one");
            Fixture::default()
        }
    };

    let opts = ShellOptions {
        json: cli.json,
        timeout: Duration::from_secs(cli.timeout),
        refresh_delay: Duration::from_millis(cli.refresh_delay_ms),
        style: StyleOptions::detect(),
    };
    let shell = Shell::new(Arc::new(inventory), opts)?;

    let summary = if !cli.exec.is_empty() {
        shell.run_lines(&cli.exec).await
    } else if let Some(script) = &cli.script {
        shell.run_script(script).await?
    } else {
        let summary = shell.run_stdin().await?;
        tracing::debug!(lines = summary.lines, failed = summary.failed, "console closed");
        return Ok(());
    };

    report(summary);
    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn report(summary: Summary) {
    if summary.failed > 0 {
        tracing::warn!(
            lines = summary.lines,
            failed = summary.failed,
            "some lines failed"
        );
    } else {
        tracing::debug!(lines = summary.lines, "all lines succeeded");
    }
}
