//! tracescope CLI
//!
//! Plays back, inspects and records execution traces.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod config;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use commands::{OutputFormat, RunOptions};
use config::AppConfig;
use logging::LogTarget;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracescope")]
#[command(about = "tracescope - step through recorded program executions", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level for tracescope crates (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a trace file
    Play {
        /// Trace file (JSON)
        trace: PathBuf,
        /// Print steps instead of opening the player
        #[arg(long)]
        headless: bool,
        /// Starting speed multiplier
        #[arg(long)]
        speed: Option<f64>,
        /// Start playing immediately
        #[arg(long)]
        autoplay: bool,
    },
    /// Print the reconstructed state at a step
    Inspect {
        /// Trace file (JSON)
        trace: PathBuf,
        /// Step index (default: last; out of range is clamped)
        #[arg(long, allow_negative_numbers = true)]
        step: Option<i64>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the call tree at a step
    Tree {
        /// Trace file (JSON)
        trace: PathBuf,
        /// Step index (default: last; out of range is clamped)
        #[arg(long, allow_negative_numbers = true)]
        step: Option<i64>,
    },
    /// Run a program through the interpreter and play its trace
    Run {
        /// Program source file
        source: PathBuf,
        /// File whose lines are fed to the program's input calls
        #[arg(long)]
        stdin: Option<PathBuf>,
        /// Save the trace to this file
        #[arg(long)]
        save: Option<PathBuf>,
        /// Print a summary instead of opening the player
        #[arg(long)]
        no_play: bool,
        /// Interpreter program (overrides the config file)
        #[arg(long)]
        interpreter: Option<String>,
    },
}

impl Commands {
    fn full_screen(&self) -> bool {
        match self {
            Self::Play { headless, .. } => !headless,
            Self::Run { no_play, .. } => !no_play,
            Self::Inspect { .. } | Self::Tree { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let target = LogTarget::select(cli.log_file.as_deref(), cli.command.full_screen());
    logging::init(cli.log_level.as_deref(), target)?;
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            trace,
            headless,
            speed,
            autoplay,
        } => {
            let config = config.with_speed(speed);
            let log = commands::load_trace(&trace)?;
            if headless {
                commands::play_headless(log, &config).await
            } else {
                commands::play_tui(log, &config, autoplay)
            }
        }
        Commands::Inspect {
            trace,
            step,
            format,
        } => {
            let log = commands::load_trace(&trace)?;
            print!("{}", commands::inspect(&log, step, format)?);
            Ok(())
        }
        Commands::Tree { trace, step } => {
            let log = commands::load_trace(&trace)?;
            print!("{}", commands::tree(&log, step));
            Ok(())
        }
        Commands::Run {
            source,
            stdin,
            save,
            no_play,
            interpreter,
        } => {
            let config = config.with_interpreter(interpreter);
            let options = RunOptions {
                stdin: stdin.as_deref(),
                save: save.as_deref(),
            };
            let log = commands::run_program(&source, options, &config).await?;
            if no_play {
                print!("{}", commands::run_summary(&log));
                Ok(())
            } else {
                commands::play_tui(log, &config, true)
            }
        }
    }
}
