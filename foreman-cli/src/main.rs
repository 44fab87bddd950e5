use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod echo;

use commands::{CliError, check, render_catalog, render_prompt, replay, run_live};
use foreman_agent::RunResult;

#[derive(Parser, Debug)]
#[command(name = "foreman", version = "0.1.0")]
#[command(about = "Foreman CLI - Inspect and replay task-delegation coordinator runs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the system prompt a run would start from
    Prompt {
        /// Path to the TOML configuration
        #[arg(long)]
        config: PathBuf,
        /// Goal text
        #[arg(long)]
        goal: String,
    },
    /// Print the tool schema offered to the decision model
    Catalog {
        #[arg(long)]
        config: PathBuf,
    },
    /// Run the coordinator against a YAML script of model replies, with echo workers
    Replay {
        #[arg(long)]
        config: PathBuf,
        /// YAML list of model replies
        #[arg(long)]
        script: PathBuf,
        #[arg(long)]
        goal: String,
        /// Ask for a condensed summary in the result
        #[arg(long)]
        summary: bool,
    },
    /// Run the coordinator against the configured model, with echo workers
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        goal: String,
        #[arg(long)]
        summary: bool,
    },
    /// Validate a configuration file
    Check {
        #[arg(long)]
        config: PathBuf,
    },
}

fn print_result(result: Result<RunResult, CliError>) -> Result<(), CliError> {
    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize JSON logging once.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Prompt { config, goal } => {
            render_prompt(&config, &goal).map(|prompt| println!("{prompt}"))
        }
        Commands::Catalog { config } => render_catalog(&config).map(|json| println!("{json}")),
        Commands::Replay {
            config,
            script,
            goal,
            summary,
        } => print_result(replay(&config, &script, &goal, summary).await),
        Commands::Run {
            config,
            goal,
            summary,
        } => print_result(run_live(&config, &goal, summary).await),
        Commands::Check { config } => check(&config).map(|report| println!("{report}")),
    };

    if let Err(e) = outcome {
        match &e {
            CliError::Coordinator(err) => tracing::error!(
                error = %err,
                code = err.error_code(),
                rationale = err.rationale(),
                "Coordinator run failed"
            ),
            _ => tracing::error!(error = %e, "Command failed"),
        }
        std::process::exit(1);
    }
}
