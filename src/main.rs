//! Gradle Composer
//!
//! Command-line entry point: parses arguments, initialises logging and runs
//! the requested command.

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gradle_composer::commands::{describe_error, CheckCommand, ComposeCommand, OutputFormat};
use gradle_composer::{APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "gradle-composer", version, about = "Compose and validate Gradle Kotlin DSL build configuration")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Composer configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved build plan
    Compose {
        /// Root project directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Validate the build configuration without printing it
    Check {
        /// Root project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} starting...", APP_NAME, VERSION);

    let outcome = match cli.command {
        Command::Compose { dir, format } => {
            let command = ComposeCommand {
                project_path: dir,
                format,
                config_path: cli.config,
            };
            command.execute().await.map(|plan| println!("{}", plan))
        }
        Command::Check { dir } => {
            let command = CheckCommand {
                project_path: dir,
                config_path: cli.config,
            };
            command.execute().await.map(|report| println!("{}", report))
        }
    };

    if let Err(err) = outcome {
        error!("{:#}", err);
        eprintln!("error: {}", describe_error(&err));
        std::process::exit(1);
    }
    Ok(())
}
