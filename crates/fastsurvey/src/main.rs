//! FastSurvey command-line interface
//!
//! - `check`: compile a survey configuration and show its field tree
//! - `submit` / `verify`: drive the pending/verified workflow
//! - `purge`: apply the pending retention policy

use anyhow::Result;
use clap::{Parser, Subcommand};
use fastsurvey_logging::{fastsurvey_home, init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "fastsurvey", about = "Survey submission and verification")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Home directory (defaults to $FASTSURVEY_HOME or ~/.fastsurvey)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a survey configuration and print its field tree
    Check {
        /// Survey configuration document (JSON)
        configuration: PathBuf,
    },

    /// Submit answers to a survey; prints the verification token
    Submit {
        /// Survey key (<admin_name>.<survey_name>)
        survey_key: String,

        /// Submission document (JSON with identity and answers)
        submission: PathBuf,
    },

    /// Verify a pending submission by token; prints the identity
    Verify {
        /// Survey key (<admin_name>.<survey_name>)
        survey_key: String,

        /// Token returned by submit
        token: String,
    },

    /// Delete pending submissions expired by the retention policy
    Purge {
        /// Survey key (<admin_name>.<survey_name>)
        survey_key: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let home = match &cli.home {
        Some(home) => home.clone(),
        None => match fastsurvey_home() {
            Ok(home) => home,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                return ExitCode::from(1);
            }
        },
    };

    let log_dir = home.join("logs");
    let _log_guard = match init_logging(LogConfig {
        app_name: "fastsurvey",
        verbose: cli.verbose,
        log_dir: Some(&log_dir),
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli.command, home) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(command: Commands, home: PathBuf) -> Result<ExitCode> {
    match command {
        Commands::Check { configuration } => cli::check::run(&configuration),
        Commands::Submit {
            survey_key,
            submission,
        } => cli::submit::run(&cli::Context::load(home)?, &survey_key, &submission),
        Commands::Verify { survey_key, token } => {
            cli::verify::run(&cli::Context::load(home)?, &survey_key, &token)
        }
        Commands::Purge { survey_key } => cli::purge::run(&cli::Context::load(home)?, &survey_key),
    }
}
