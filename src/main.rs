//! Binary entry point for sarathi.
//!
//! Runs single TIL commands from the shell, or a chat loop that reads one
//! chat message per line from stdin.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sarathi::commands::{Dispatcher, TilAction};
use sarathi::{FortuneService, Reply, SarathiConfig, TilService, observability};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Sarathi - a personal bot for Today I Learned notes.
#[derive(Parser)]
#[command(name = "sarathi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "SARATHI_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Record or search TILs.
    Til {
        /// `add` or `find`.
        #[command(subcommand)]
        action: TilAction,
    },

    /// Read chat messages from stdin, one per line, and answer each.
    Chat,

    /// Print a random epigram.
    Fortune {
        /// Arguments passed to `fortune`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Look up missing page titles of URL entries.
    FixTitles,

    /// Regenerate and publish the TIL page.
    RenderPage,
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match SarathiConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &SarathiConfig) -> Result<()> {
    match command {
        Commands::Til { action } => cmd_til(config, action),
        Commands::Chat => cmd_chat(config),
        Commands::Fortune { args } => cmd_fortune(config, args),
        Commands::FixTitles => {
            let outcome = TilService::from_config(config)
                .fix_titles()
                .context("fixing titles")?;
            print_reply(&outcome.into_reply());
            Ok(())
        },
        Commands::RenderPage => {
            let outcome = TilService::from_config(config)
                .render_page()
                .context("rendering the TIL page")?;
            print_reply(&outcome.into_reply());
            Ok(())
        },
    }
}

fn cmd_til(config: &SarathiConfig, action: TilAction) -> Result<()> {
    let query = action.into_query()?;
    let outcome = TilService::from_config(config).process(query)?;
    print_reply(&outcome.into_reply());
    Ok(())
}

fn cmd_fortune(config: &SarathiConfig, args: Vec<String>) -> Result<()> {
    let text = FortuneService::new(&config.fortune_path).run(&args)?;
    println!("{text}");
    Ok(())
}

fn cmd_chat(config: &SarathiConfig) -> Result<()> {
    let dispatcher = Dispatcher::new(
        TilService::from_config(config),
        FortuneService::new(&config.fortune_path),
    );
    if config.testing {
        tracing::info!("Testing mode: changes are not saved or published");
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = dispatcher.handle(&line)?;
        print_reply(&reply);
        println!();
        io::stdout().flush().context("writing stdout")?;
    }
    Ok(())
}

fn print_reply(reply: &Reply) {
    println!("{reply}");
}
