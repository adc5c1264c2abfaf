//! proctor CLI — hosting shell for the timed assessment engine.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Timed assessment engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an assessment interactively or from a script
    Take {
        /// Path to the assessment .toml file
        #[arg(long)]
        assessment: PathBuf,

        /// Read session commands from this file instead of stdin
        #[arg(long)]
        script: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for attempt reports (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Report formats: json, html, all, none
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Score a saved set of responses without running a session
    Grade {
        /// Path to the assessment .toml file
        #[arg(long)]
        assessment: PathBuf,

        /// JSON object mapping question ids to responses
        #[arg(long)]
        responses: PathBuf,
    },

    /// Validate assessment TOML files
    Validate {
        /// Path to assessment file or directory
        #[arg(long)]
        assessment: PathBuf,
    },

    /// Create starter config and example assessment
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("proctor=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            assessment,
            script,
            config,
            output,
            format,
        } => commands::take::execute(assessment, script, config, output, format).await,
        Commands::Grade {
            assessment,
            responses,
        } => commands::grade::execute(assessment, responses),
        Commands::Validate { assessment } => commands::validate::execute(assessment),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
